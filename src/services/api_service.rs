use crate::api::{create_router, ApiState};
use crate::config::ServerConfig;
use anyhow::Result;
use tracing::info;

pub struct ApiService {
    config: ServerConfig,
    state: ApiState,
}

impl ApiService {
    pub fn new(config: ServerConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    pub async fn start(self) -> Result<()> {
        info!("🚀 启动状态API服务...");

        let app = create_router(self.state);
        let address = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&address).await?;

        info!("API Server starting on {}", address);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
