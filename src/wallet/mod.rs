//! Wallet balance core
//!
//! # Architecture
//!
//! ```text
//! gateway ──▶ BalanceEngine ──▶ LedgerStore (PostgreSQL | memory)
//!                 │
//!                 └── RetryPolicy (conflict → linear backoff, max 5 attempts)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Non-negative**: a withdraw larger than the locked balance fails with
//!    `InsufficientFunds`; nothing is written
//! 2. **Store-only coordination**: row lock + SERIALIZABLE in the store, no
//!    in-process locks, so several processes may share one database
//! 3. **No open transactions**: every attempt ends in commit or rollback,
//!    including on cancellation
//! 4. **Retry only conflicts**: every other error is deterministic and
//!    surfaces unchanged

pub mod context;
pub mod engine;
pub mod error;
pub mod memory_store;
pub mod pg_store;
pub mod retry;
pub mod schema;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use context::{CallContext, CancelHandle};
pub use engine::BalanceEngine;
pub use error::{StoreError, WalletError};
pub use memory_store::{MemoryLedger, StoreStats};
pub use pg_store::PgLedgerStore;
pub use retry::{AttemptState, RetryPolicy};
pub use store::{LedgerStore, LedgerTx};
pub use types::{OperationKind, Wallet, WalletId};
