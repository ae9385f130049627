use anyhow::{anyhow, Result};
use supra_price_bot::database::{CandleOperations, TokenOperations};
use supra_price_bot::{Config, Database};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DUMP_TIMEFRAME: &str = "5m";
const DUMP_LIMIT: i64 = 100;

/// 打印基础币与 SPIKE 交易对最近的K线，用于核对索引器数据
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let database = Database::connect(&config.database.url, 2).await?;

    let spike_address = config
        .tokens
        .spike_token_address
        .as_deref()
        .ok_or_else(|| anyhow!("缺少SPIKE_TOKEN_ADDRESS配置"))?;

    let base = TokenOperations::find_by_address(database.pool(), &config.tokens.base_coin_address)
        .await?
        .ok_or_else(|| anyhow!("基础币不存在: {}", config.tokens.base_coin_address))?;
    let spike = TokenOperations::find_by_address(database.pool(), spike_address)
        .await?
        .ok_or_else(|| anyhow!("SPIKE代币不存在: {}", spike_address))?;

    info!("📊 {}/{} 最近 {} 根 {} K线", spike.symbol, base.symbol, DUMP_LIMIT, DUMP_TIMEFRAME);

    let candles = CandleOperations::find_recent_for_pair(
        database.pool(),
        &base.address,
        &spike.address,
        DUMP_TIMEFRAME,
        DUMP_LIMIT,
    )
    .await?;

    for candle in &candles {
        println!(
            "{}  O {:<18} H {:<18} L {:<18} C {:<18} V {}",
            candle.timestamp.format("%Y-%m-%d %H:%M"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        );
    }
    println!("共 {} 根K线", candles.len());

    Ok(())
}
