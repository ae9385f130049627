use crate::types::Candle;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

pub struct CandleOperations;

const CANDLE_COLUMNS: &str = "token0_address, token1_address, timeframe, timestamp, \
     open, high, low, close, volume, trade_count";

impl CandleOperations {
    /// 查询某代币在 `since` 之后（不含）的全部有成交量K线，按时间升序
    pub async fn find_candles_since(
        pool: &PgPool,
        token_address: &str,
        timeframe: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let candles = sqlx::query_as::<_, Candle>(&format!(
            r#"
            SELECT {}
            FROM ohlc_data
            WHERE (token0_address = $1 OR token1_address = $1)
              AND timeframe = $2
              AND timestamp > $3
              AND volume > 0
            ORDER BY timestamp ASC
            "#,
            CANDLE_COLUMNS
        ))
        .bind(token_address)
        .bind(timeframe)
        .bind(since)
        .fetch_all(pool)
        .await?;

        Ok(candles)
    }

    /// 交易对最近 `limit` 根K线，返回时按时间升序排列
    pub async fn find_recent_for_pair(
        pool: &PgPool,
        token_a: &str,
        token_b: &str,
        timeframe: &str,
        limit: i64,
    ) -> Result<Vec<Candle>> {
        let (token0, token1) = sorted_pair(token_a, token_b);

        let mut candles = sqlx::query_as::<_, Candle>(&format!(
            r#"
            SELECT {}
            FROM ohlc_data
            WHERE token0_address = $1 AND token1_address = $2 AND timeframe = $3
            ORDER BY timestamp DESC
            LIMIT $4
            "#,
            CANDLE_COLUMNS
        ))
        .bind(token0)
        .bind(token1)
        .bind(timeframe)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        candles.reverse();
        Ok(candles)
    }

    /// 交易对最新一根K线，两种存储方向都匹配
    pub async fn find_latest_for_pair(
        pool: &PgPool,
        token_a: &str,
        token_b: &str,
        timeframe: &str,
    ) -> Result<Option<Candle>> {
        let candle = sqlx::query_as::<_, Candle>(&format!(
            r#"
            SELECT {}
            FROM ohlc_data
            WHERE ((token0_address = $1 AND token1_address = $2)
                OR (token0_address = $2 AND token1_address = $1))
              AND timeframe = $3
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
            CANDLE_COLUMNS
        ))
        .bind(token_a)
        .bind(token_b)
        .bind(timeframe)
        .fetch_optional(pool)
        .await?;

        Ok(candle)
    }
}

/// 索引器按地址字典序存储交易对
pub fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_pair() {
        assert_eq!(sorted_pair("0xb", "0xa"), ("0xa", "0xb"));
        assert_eq!(sorted_pair("0xa", "0xb"), ("0xa", "0xb"));
    }
}
