use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use supra_price_bot::api::ApiState;
use supra_price_bot::bot::BotContext;
use supra_price_bot::services::{
    ApiService, BotService, MarketCapService, PlottersChartRenderer, SpikeMonitor, SupraOracleClient,
    TelegramNotifier,
};
use supra_price_bot::{Cache, Config, Database};
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🔧 启动价格机器人 (Telegram + 异动监控 + 状态API)...");

    let config = Config::from_env()?;
    if config.telegram.bot_token.is_empty() {
        return Err(anyhow!("缺少TELEGRAM_BOT_TOKEN配置"));
    }
    info!("Configuration loaded successfully");

    let database = Database::connect(&config.database.url, config.database.max_connections).await?;
    database.create_tables().await?;
    info!("✅ 数据库连接成功");

    let cache = Arc::new(Cache::new(Duration::from_secs(config.cache.default_ttl_secs)));
    let bot = Bot::new(&config.telegram.bot_token);

    let oracle = match config.oracle.clone() {
        Some(oracle_config) => Some(SupraOracleClient::new(oracle_config)?),
        None => {
            warn!("⚠️ 未配置价格预言机，市值将显示为0");
            None
        }
    };

    let monitor = if config.monitor.enabled {
        let monitor = Arc::new(SpikeMonitor::new(
            Arc::new(database.clone()),
            Arc::new(TelegramNotifier::new(bot.clone())),
            Arc::clone(&cache),
            config.monitor.clone(),
            config.links.clone(),
        ));

        let runner = Arc::clone(&monitor);
        tokio::spawn(async move {
            if let Err(e) = runner.start().await {
                error!("Spike monitor error: {}", e);
            }
        });
        Some(monitor)
    } else {
        info!("异动监控已关闭");
        None
    };

    if config.server.enabled {
        let api_service = ApiService::new(
            config.server.clone(),
            ApiState::new(database.clone(), Arc::clone(&cache), monitor.clone()),
        );
        tokio::spawn(async move {
            if let Err(e) = api_service.start().await {
                error!("API service error: {}", e);
            }
        });
    }

    // 定期清理过期缓存
    let sweeper = Arc::clone(&cache);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweeper.default_ttl());
        loop {
            interval.tick().await;
            let purged = sweeper.purge_expired();
            if purged > 0 {
                info!("🧹 清理过期缓存 {} 条", purged);
            }
        }
    });

    let context = Arc::new(BotContext {
        db: database.clone(),
        cache: Arc::clone(&cache),
        market_cap: MarketCapService::new(
            database,
            Arc::clone(&cache),
            oracle,
            config.tokens.base_coin_address.clone(),
        ),
        renderer: Arc::new(PlottersChartRenderer::default()),
        config,
    });

    BotService::new(bot, context).start().await
}
