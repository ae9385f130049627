use crate::database::utils::*;
use crate::types::{ActiveMonitor, GroupConfiguration, Token};
use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

pub struct GroupOperations;

const GROUP_COLUMNS: &str = "chat_id, spike_monitor_enabled, spike_monitor_token_id, \
     spike_monitor_thread_id, spike_monitor_gif_url, created_at, updated_at";

const GROUP_WITH_TOKEN_SELECT: &str = r#"
    SELECT
        g.chat_id, g.spike_monitor_enabled, g.spike_monitor_token_id,
        g.spike_monitor_thread_id, g.spike_monitor_gif_url, g.created_at, g.updated_at,
        t.id AS token_id, t.address AS token_address, t.symbol AS token_symbol,
        t.name AS token_name, t.decimals AS token_decimals,
        t.circulating_supply AS token_circulating_supply, t.max_supply AS token_max_supply
    FROM group_configurations g
    LEFT JOIN tokens t ON t.id = g.spike_monitor_token_id
"#;

impl GroupOperations {
    pub async fn find_by_chat_id(pool: &PgPool, chat_id: i64) -> Result<Option<GroupConfiguration>> {
        let config = sqlx::query_as::<_, GroupConfiguration>(&format!(
            "SELECT {} FROM group_configurations WHERE chat_id = $1",
            GROUP_COLUMNS
        ))
        .bind(chat_id)
        .fetch_optional(pool)
        .await?;

        Ok(config)
    }

    /// 群组配置连同其监控代币
    pub async fn find_with_token(pool: &PgPool, chat_id: i64) -> Result<Option<ActiveMonitor>> {
        let row = sqlx::query(&format!("{} WHERE g.chat_id = $1", GROUP_WITH_TOKEN_SELECT))
            .bind(chat_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.as_ref().map(map_group_with_token))
    }

    /// 所有开启了异动监控的群组
    pub async fn find_active_with_tokens(pool: &PgPool) -> Result<Vec<ActiveMonitor>> {
        let rows = sqlx::query(&format!(
            "{} WHERE g.spike_monitor_enabled = TRUE ORDER BY g.chat_id",
            GROUP_WITH_TOKEN_SELECT
        ))
        .fetch_all(pool)
        .await?;

        Ok(rows.iter().map(map_group_with_token).collect())
    }

    /// 设置监控代币并自动开启监控
    pub async fn set_monitor_token(pool: &PgPool, chat_id: i64, token_id: i32) -> Result<GroupConfiguration> {
        let config = sqlx::query_as::<_, GroupConfiguration>(&format!(
            r#"
            INSERT INTO group_configurations (chat_id, spike_monitor_token_id, spike_monitor_enabled)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (chat_id) DO UPDATE SET
                spike_monitor_token_id = EXCLUDED.spike_monitor_token_id,
                spike_monitor_enabled = TRUE,
                updated_at = NOW()
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(chat_id)
        .bind(token_id)
        .fetch_one(pool)
        .await?;

        Ok(config)
    }

    /// 切换监控开关；开启时记录当前话题ID（为空则清除）
    pub async fn toggle_monitor(
        pool: &PgPool,
        chat_id: i64,
        thread_id: Option<i32>,
    ) -> Result<GroupConfiguration> {
        let config = sqlx::query_as::<_, GroupConfiguration>(&format!(
            r#"
            INSERT INTO group_configurations (chat_id, spike_monitor_enabled, spike_monitor_thread_id)
            VALUES ($1, TRUE, $2)
            ON CONFLICT (chat_id) DO UPDATE SET
                spike_monitor_enabled = NOT group_configurations.spike_monitor_enabled,
                spike_monitor_thread_id = CASE
                    WHEN group_configurations.spike_monitor_enabled
                        THEN group_configurations.spike_monitor_thread_id
                    ELSE EXCLUDED.spike_monitor_thread_id
                END,
                updated_at = NOW()
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(chat_id)
        .bind(thread_id)
        .fetch_one(pool)
        .await?;

        Ok(config)
    }

    pub async fn set_gif_url(pool: &PgPool, chat_id: i64, gif_url: &str) -> Result<GroupConfiguration> {
        let config = sqlx::query_as::<_, GroupConfiguration>(&format!(
            r#"
            INSERT INTO group_configurations (chat_id, spike_monitor_gif_url)
            VALUES ($1, $2)
            ON CONFLICT (chat_id) DO UPDATE SET
                spike_monitor_gif_url = EXCLUDED.spike_monitor_gif_url,
                updated_at = NOW()
            RETURNING {}
            "#,
            GROUP_COLUMNS
        ))
        .bind(chat_id)
        .bind(gif_url)
        .fetch_one(pool)
        .await?;

        Ok(config)
    }
}

fn map_group_with_token(row: &PgRow) -> ActiveMonitor {
    let config = GroupConfiguration {
        chat_id: safe_get_i64(row, "chat_id"),
        spike_monitor_enabled: safe_get_bool(row, "spike_monitor_enabled"),
        spike_monitor_token_id: safe_get_optional_i32(row, "spike_monitor_token_id"),
        spike_monitor_thread_id: safe_get_optional_i32(row, "spike_monitor_thread_id"),
        spike_monitor_gif_url: safe_get_optional_string(row, "spike_monitor_gif_url"),
        created_at: safe_get_datetime(row, "created_at"),
        updated_at: safe_get_datetime(row, "updated_at"),
    };

    let token = safe_get_optional_i32(row, "token_id").map(|id| Token {
        id,
        address: safe_get_string(row, "token_address"),
        symbol: safe_get_string(row, "token_symbol"),
        name: safe_get_optional_string(row, "token_name"),
        decimals: safe_get_i32(row, "token_decimals"),
        circulating_supply: safe_get_optional_decimal(row, "token_circulating_supply"),
        max_supply: safe_get_optional_decimal(row, "token_max_supply"),
    });

    ActiveMonitor { config, token }
}
