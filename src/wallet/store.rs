//! Ledger Store contract
//!
//! The engine talks to persistence only through these two traits. A store
//! must provide:
//! - row-level exclusive locks taken by [`LedgerTx::lock_and_read_balance`]
//!   and held until commit or rollback
//! - serializable isolation, reporting anomalies as [`StoreError::Conflict`]
//!
//! A transaction handle that is dropped without `commit` must roll back.

use async_trait::async_trait;

use super::error::StoreError;
use super::types::WalletId;

#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Point read of the last committed balance. No lock, no transaction.
    async fn read_balance(&self, id: WalletId) -> Result<i64, StoreError>;

    /// Start a transaction at serializable isolation.
    async fn begin_serializable(&self) -> Result<Self::Tx, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LedgerTx: Send + 'static {
    /// Read the balance and take an exclusive lock on the row.
    async fn lock_and_read_balance(&mut self, id: WalletId) -> Result<i64, StoreError>;

    async fn write_balance(&mut self, id: WalletId, balance: i64) -> Result<(), StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    /// Discard the transaction. Safe on every exit path.
    async fn rollback(self) -> Result<(), StoreError>;
}
