//! SwiftWallet - concurrent wallet balance service
//!
//! Many callers deposit into and withdraw from shared wallets; the balance
//! never goes negative and concurrent mutations serialize in the database.
//!
//! # Modules
//!
//! - [`wallet`] - Balance engine, ledger store contract and implementations
//! - [`gateway`] - axum HTTP layer (`/api/v1/wallet`, `/api/v1/wallets/{id}`)
//! - [`db`] - PostgreSQL connection pool
//! - [`config`] - YAML + environment configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod wallet;

// Convenient re-exports at crate root
pub use wallet::{
    BalanceEngine, CallContext, LedgerStore, LedgerTx, MemoryLedger, OperationKind,
    PgLedgerStore, RetryPolicy, WalletError, WalletId,
};
