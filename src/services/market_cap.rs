use crate::cache::Cache;
use crate::database::{CandleOperations, Database};
use crate::services::lookups::CachedLookups;
use crate::services::oracle::SupraOracleClient;
use crate::types::Candle;
use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, warn};

const MARKET_CAP_TIMEFRAME: &str = "5m";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketCap {
    pub market_cap: Option<Decimal>,
    pub max_supply: Option<Decimal>,
}

pub struct MarketCapService {
    db: Database,
    cache: Arc<Cache>,
    oracle: Option<SupraOracleClient>,
    base_coin_address: String,
}

impl MarketCapService {
    pub fn new(
        db: Database,
        cache: Arc<Cache>,
        oracle: Option<SupraOracleClient>,
        base_coin_address: String,
    ) -> Self {
        Self {
            db,
            cache,
            oracle,
            base_coin_address,
        }
    }

    /// 计算代币市值，任何环节失败都返回空值
    pub async fn market_cap(&self, token_address: &str) -> MarketCap {
        match self.try_market_cap(token_address).await {
            Ok(market_cap) => market_cap,
            Err(e) => {
                error!("❌ 计算 {} 市值失败: {}", token_address, e);
                MarketCap::default()
            }
        }
    }

    async fn try_market_cap(&self, token_address: &str) -> Result<MarketCap> {
        let token = match CachedLookups::token_by_address(&self.db, &self.cache, token_address).await? {
            Some(token) => token,
            None => return Ok(MarketCap::default()),
        };
        let Some(circulating_supply) = token.circulating_supply else {
            return Ok(MarketCap::default());
        };

        let latest = CandleOperations::find_latest_for_pair(
            self.db.pool(),
            token_address,
            &self.base_coin_address,
            MARKET_CAP_TIMEFRAME,
        )
        .await?;
        let Some(price_in_base) = latest.and_then(|candle| price_in_base(&candle, &self.base_coin_address)) else {
            return Ok(MarketCap::default());
        };

        let oracle = self.oracle.as_ref().ok_or_else(|| anyhow!("未配置价格预言机"))?;
        let base_usd = oracle.base_price_usd().await?;
        if base_usd.is_zero() {
            warn!("⚠️ 预言机返回的基础币价格为0");
            return Ok(MarketCap::default());
        }

        let Some(market_cap) = usd_market_cap(price_in_base, base_usd, circulating_supply) else {
            warn!("⚠️ {} 市值计算溢出", token_address);
            return Ok(MarketCap::default());
        };

        Ok(MarketCap {
            market_cap: Some(market_cap),
            max_supply: token.max_supply,
        })
    }
}

/// 以基础币计价的代币价格；基础币在 token1 一侧时取倒数
pub fn price_in_base(candle: &Candle, base_coin_address: &str) -> Option<Decimal> {
    if candle.token1_address == base_coin_address {
        return Decimal::ONE.checked_div(candle.close);
    }
    Some(candle.close)
}

/// 价格 × 基础币美元价 × 流通量，溢出时无结果
pub fn usd_market_cap(price_in_base: Decimal, base_usd: Decimal, circulating_supply: Decimal) -> Option<Decimal> {
    price_in_base.checked_mul(base_usd)?.checked_mul(circulating_supply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    const BASE: &str = "0x1::supra_coin::SupraCoin";
    const TOKEN: &str = "0xfec1::memecoins::SPIKE";

    fn candle(token0: &str, token1: &str, close: Decimal) -> Candle {
        Candle {
            token0_address: token0.to_string(),
            token1_address: token1.to_string(),
            timeframe: "5m".to_string(),
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1),
            trade_count: None,
        }
    }

    #[test]
    fn test_price_when_base_is_token0() {
        assert_eq!(price_in_base(&candle(BASE, TOKEN, dec!(0.25)), BASE), Some(dec!(0.25)));
    }

    #[test]
    fn test_price_inverted_when_base_is_token1() {
        assert_eq!(price_in_base(&candle(TOKEN, BASE, dec!(4)), BASE), Some(dec!(0.25)));
    }

    #[test]
    fn test_zero_close_with_base_token1() {
        assert_eq!(price_in_base(&candle(TOKEN, BASE, Decimal::ZERO), BASE), None);
    }

    #[test]
    fn test_usd_market_cap() {
        assert_eq!(usd_market_cap(dec!(0.25), dec!(0.004), dec!(1000000)), Some(dec!(1000)));
    }

    #[test]
    fn test_usd_market_cap_overflow() {
        assert_eq!(usd_market_cap(Decimal::MAX, dec!(2), dec!(1)), None);
        assert_eq!(usd_market_cap(dec!(1000000000000), dec!(1000000000000), dec!(1000000000000000000)), None);
    }
}
