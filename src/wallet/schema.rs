//! `wallets` table DDL
//!
//! The CHECK constraint is a last line of defense; the engine never writes a
//! negative balance.

use sqlx::PgPool;

pub const CREATE_WALLETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    id         UUID        PRIMARY KEY,
    balance    BIGINT      NOT NULL DEFAULT 0 CHECK (balance >= 0),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

/// Create the schema if it does not exist yet
pub async fn apply(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_WALLETS_TABLE).execute(pool).await?;
    tracing::info!("wallets schema ensured");
    Ok(())
}
