use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::wallet::{RetryPolicy, WalletId};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default)]
    pub use_json: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub store: StoreKind,
    /// Wallets provisioned into the in-memory store at startup
    #[serde(default)]
    pub seed_wallets: Vec<SeedWallet>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SeedWallet {
    pub id: WalletId,
    #[serde(default)]
    pub balance: i64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_file() -> String {
    "swift_wallet.log".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            use_json: false,
            rotation: default_rotation(),
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            retry: RetryConfig::default(),
            store: StoreKind::default(),
            seed_wallets: Vec::new(),
        }
    }
}

/// Which ledger store backs the engine
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Postgres,
    /// Process-local store, for demos and load tests
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => bail!("unknown store kind: {other}"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Deadline handed to the engine for each mutation request
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_ms: 15_000,
            shutdown_timeout_ms: 10_000,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// PostgreSQL connection settings.
///
/// `url` wins; otherwise it is assembled from the individual parts.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_secs: u64,
    /// Run `CREATE TABLE IF NOT EXISTS wallets` at startup
    pub apply_schema: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            host: String::new(),
            port: String::new(),
            user: String::new(),
            password: String::new(),
            name: String::new(),
            max_connections: 100,
            max_lifetime_secs: 3600,
            acquire_timeout_secs: 5,
            apply_schema: false,
        }
    }
}

impl DatabaseConfig {
    fn assemble_url(&mut self) {
        if !self.url.is_empty() {
            return;
        }
        let parts = [
            &self.host,
            &self.port,
            &self.user,
            &self.password,
            &self.name,
        ];
        if parts.iter().all(|p| !p.is_empty()) {
            self.url = format!(
                "postgres://{}:{}@{}:{}/{}?sslmode=disable",
                self.user, self.password, self.host, self.port, self.name
            );
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
        )
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml` (defaults if absent), then apply process
    /// environment overrides. Call [`AppConfig::finalize`] once command-line
    /// overrides are in place.
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let mut config = if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Overrides: `APP_PORT`, `DATABASE_URL`, `DB_HOST`, `DB_PORT`,
    /// `DB_USER`, `DB_PASS`, `DB_NAME`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(port) = get("APP_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
        let db = &mut self.database;
        if let Some(v) = get("DATABASE_URL") {
            db.url = v;
        }
        if let Some(v) = get("DB_HOST") {
            db.host = v;
        }
        if let Some(v) = get("DB_PORT") {
            db.port = v;
        }
        if let Some(v) = get("DB_USER") {
            db.user = v;
        }
        if let Some(v) = get("DB_PASS") {
            db.password = v;
        }
        if let Some(v) = get("DB_NAME") {
            db.name = v;
        }
    }

    /// Assemble derived values and reject unusable configurations.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        self.database.assemble_url();
        if self.store == StoreKind::Postgres && self.database.url.is_empty() {
            bail!("missing required DB_* environment variables");
        }
        if let Some(seed) = self.seed_wallets.iter().find(|w| w.balance < 0) {
            bail!("seed wallet {} has a negative balance", seed.id);
        }
        Ok(())
    }
}
