use anyhow::Result;
use sqlx::PgPool;

pub struct SystemOperations;

impl SystemOperations {
    /// 仅创建机器人自有的表；tokens 与 ohlc_data 由索引器维护
    pub async fn create_tables(pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_configurations (
                chat_id BIGINT PRIMARY KEY,
                spike_monitor_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                spike_monitor_token_id INTEGER REFERENCES tokens(id),
                spike_monitor_thread_id INTEGER,
                spike_monitor_gif_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                user_id BIGINT PRIMARY KEY,
                default_token_address TEXT,
                default_timeframe VARCHAR(8),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_group_configurations_enabled ON group_configurations(spike_monitor_enabled)",
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn ping(pool: &PgPool) -> Result<()> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}
