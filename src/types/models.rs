use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 由外部索引器维护的代币记录
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Token {
    pub id: i32,
    pub address: String,
    pub symbol: String,
    pub name: Option<String>,
    pub decimals: i32,
    pub circulating_supply: Option<Decimal>,
    pub max_supply: Option<Decimal>,
}

/// OHLC K线，token0/token1 的顺序只是存储约定，不代表方向
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Candle {
    pub token0_address: String,
    pub token1_address: String,
    pub timeframe: String,
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trade_count: Option<i64>,
}

impl Candle {
    /// 交易对中另一侧的代币地址
    pub fn companion_of<'a>(&'a self, token_address: &str) -> &'a str {
        if self.token0_address == token_address {
            &self.token1_address
        } else {
            &self.token0_address
        }
    }

    pub fn change_percent(&self) -> Option<Decimal> {
        percent_change(self.open, self.close)
    }
}

/// (close - open) / open * 100，open 为 0 或结果超出 Decimal 范围时无定义
pub fn percent_change(open: Decimal, close: Decimal) -> Option<Decimal> {
    if open.is_zero() {
        return None;
    }
    close
        .checked_sub(open)?
        .checked_div(open)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct GroupConfiguration {
    pub chat_id: i64,
    pub spike_monitor_enabled: bool,
    pub spike_monitor_token_id: Option<i32>,
    pub spike_monitor_thread_id: Option<i32>,
    pub spike_monitor_gif_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: i64,
    pub default_token_address: Option<String>,
    pub default_timeframe: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserPreference {
    pub default_token_address: Option<String>,
    pub default_timeframe: Option<String>,
}

pub const SUPPORTED_TIMEFRAMES: [&str; 4] = ["1m", "5m", "1h", "1d"];

pub fn is_supported_timeframe(timeframe: &str) -> bool {
    SUPPORTED_TIMEFRAMES.contains(&timeframe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(open: Decimal, close: Decimal) -> Candle {
        Candle {
            token0_address: "0x1::supra_coin::SupraCoin".to_string(),
            token1_address: "0xabc::memecoins::SPIKE".to_string(),
            timeframe: "1m".to_string(),
            timestamp: Utc::now(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: dec!(10),
            trade_count: Some(3),
        }
    }

    #[test]
    fn test_change_percent() {
        assert_eq!(candle(dec!(1.0), dec!(1.05)).change_percent(), Some(dec!(5)));
        let down = candle(dec!(1.05), dec!(1.00)).change_percent().unwrap();
        assert!(down < dec!(-4.76) && down > dec!(-4.77));
    }

    #[test]
    fn test_change_percent_zero_open() {
        assert_eq!(candle(Decimal::ZERO, dec!(2)).change_percent(), None);
    }

    #[test]
    fn test_change_percent_overflow() {
        assert_eq!(candle(Decimal::new(1, 28), dec!(1000)).change_percent(), None);
        assert_eq!(candle(Decimal::new(1, 28), Decimal::MAX).change_percent(), None);
    }

    #[test]
    fn test_companion_of() {
        let c = candle(dec!(1), dec!(1));
        assert_eq!(c.companion_of("0xabc::memecoins::SPIKE"), "0x1::supra_coin::SupraCoin");
        assert_eq!(c.companion_of("0x1::supra_coin::SupraCoin"), "0xabc::memecoins::SPIKE");
    }

    #[test]
    fn test_supported_timeframes() {
        assert!(is_supported_timeframe("5m"));
        assert!(!is_supported_timeframe("15m"));
    }
}
