use super::{CandleOperations, Database, GroupOperations};
use crate::types::{ActiveMonitor, Candle};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 异动监控所需的数据访问接口，查无结果时返回空集合而非错误
#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn find_active_group_configurations(&self) -> Result<Vec<ActiveMonitor>>;

    async fn find_candles_since(
        &self,
        token_address: &str,
        timeframe: &str,
        since_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Candle>>;
}

#[async_trait]
impl MonitorStore for Database {
    async fn find_active_group_configurations(&self) -> Result<Vec<ActiveMonitor>> {
        GroupOperations::find_active_with_tokens(self.pool()).await
    }

    async fn find_candles_since(
        &self,
        token_address: &str,
        timeframe: &str,
        since_exclusive: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        CandleOperations::find_candles_since(self.pool(), token_address, timeframe, since_exclusive).await
    }
}
