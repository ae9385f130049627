use crate::types::Token;
use anyhow::Result;
use sqlx::PgPool;

pub struct TokenOperations;

const TOKEN_COLUMNS: &str =
    "id, address, symbol, name, decimals, circulating_supply, max_supply";

impl TokenOperations {
    pub async fn find_by_address(pool: &PgPool, address: &str) -> Result<Option<Token>> {
        let token = sqlx::query_as::<_, Token>(&format!(
            "SELECT {} FROM tokens WHERE address = $1 LIMIT 1",
            TOKEN_COLUMNS
        ))
        .bind(address)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Token>> {
        let token = sqlx::query_as::<_, Token>(&format!(
            "SELECT {} FROM tokens WHERE id = $1",
            TOKEN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }
}
