//! SwiftWallet - HTTP entry point
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────────┐    ┌────────────┐
//! │  Config  │───▶│ Gateway  │───▶│ BalanceEngine │───▶│ PostgreSQL │
//! │(YAML+env)│    │  (axum)  │    │ (retry loop)  │    │ (wallets)  │
//! └──────────┘    └──────────┘    └───────────────┘    └────────────┘
//! ```
//!
//! Flags: `--env <name>` (config/<name>.yaml), `--port <n>`,
//! `--store postgres|memory`.

use std::sync::Arc;

use anyhow::Context;

use swift_wallet::config::{AppConfig, StoreKind};
use swift_wallet::db::Database;
use swift_wallet::gateway::{self, state::AppState};
use swift_wallet::wallet::{BalanceEngine, LedgerStore, MemoryLedger, PgLedgerStore, schema};

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    get_arg(&["--port"]).and_then(|p| p.parse().ok())
}

fn get_store_override() -> anyhow::Result<Option<StoreKind>> {
    get_arg(&["--store"]).map(|s| s.parse()).transpose()
}

async fn serve_with<S: LedgerStore>(config: &AppConfig, store: S) -> anyhow::Result<()> {
    let engine = BalanceEngine::with_policy(store, config.retry.policy());
    let state = Arc::new(AppState::new(engine, config.gateway.request_timeout()));
    gateway::run_server(&config.gateway, state).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env)?;
    if let Some(store) = get_store_override()? {
        config.store = store;
    }
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }
    config.finalize()?;

    let _log_guard = swift_wallet::logging::init_logging(&config);
    tracing::info!(
        env = %env,
        store = ?config.store,
        port = config.gateway.port,
        max_attempts = config.retry.max_attempts,
        "Starting swift_wallet"
    );

    match config.store {
        StoreKind::Postgres => {
            let db = Database::connect(&config.database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.health_check()
                .await
                .context("PostgreSQL startup probe failed")?;
            if config.database.apply_schema {
                schema::apply(db.pool())
                    .await
                    .context("Failed to apply wallets schema")?;
            }
            let store = PgLedgerStore::new(db.pool().clone());
            serve_with(&config, store).await?;
            db.close().await;
        }
        StoreKind::Memory => {
            tracing::warn!("using in-memory store: balances are lost on exit");
            let store = MemoryLedger::new();
            for seed in &config.seed_wallets {
                store.insert_wallet(seed.id, seed.balance);
            }
            tracing::info!(wallets = config.seed_wallets.len(), "in-memory wallets seeded");
            serve_with(&config, store).await?;
        }
    }

    Ok(())
}
