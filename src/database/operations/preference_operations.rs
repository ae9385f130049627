use crate::types::{UpdateUserPreference, UserPreference};
use anyhow::Result;
use sqlx::PgPool;

pub struct PreferenceOperations;

impl PreferenceOperations {
    pub async fn get_user_preference(pool: &PgPool, user_id: i64) -> Result<Option<UserPreference>> {
        let preference = sqlx::query_as::<_, UserPreference>(
            r#"
            SELECT user_id, default_token_address, default_timeframe, updated_at
            FROM user_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(preference)
    }

    /// 只覆盖传入的字段，未传入的保持原值
    pub async fn set_user_preference(
        pool: &PgPool,
        user_id: i64,
        update: &UpdateUserPreference,
    ) -> Result<UserPreference> {
        let preference = sqlx::query_as::<_, UserPreference>(
            r#"
            INSERT INTO user_preferences (user_id, default_token_address, default_timeframe)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET
                default_token_address = COALESCE(EXCLUDED.default_token_address, user_preferences.default_token_address),
                default_timeframe = COALESCE(EXCLUDED.default_timeframe, user_preferences.default_timeframe),
                updated_at = NOW()
            RETURNING user_id, default_token_address, default_timeframe, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&update.default_token_address)
        .bind(&update.default_timeframe)
        .fetch_one(pool)
        .await?;

        Ok(preference)
    }
}
