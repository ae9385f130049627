pub mod handlers;
pub mod routes;

pub use routes::create_router;

use crate::cache::Cache;
use crate::database::Database;
use crate::services::SpikeMonitor;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub database: Database,
    pub cache: Arc<Cache>,
    /// 监控关闭时为空
    pub monitor: Option<Arc<SpikeMonitor>>,
}

impl ApiState {
    pub fn new(database: Database, cache: Arc<Cache>, monitor: Option<Arc<SpikeMonitor>>) -> Self {
        Self {
            database,
            cache,
            monitor,
        }
    }
}
