//! In-memory ledger store
//!
//! Models the PostgreSQL store's transaction semantics:
//! - one async mutex per wallet row, held by a transaction from
//!   `lock_and_read_balance` until commit/rollback/drop
//! - every commit takes the next value of a global commit sequence and
//!   stamps it on the rows it writes
//! - a transaction's snapshot is the commit sequence when it locks its first
//!   row (after queueing, like the advisory lock taken before BEGIN), or at
//!   begin for [`MemoryLedger::with_snapshot_at_begin`]
//! - locking a row committed after the snapshot fails with `Conflict`, as
//!   SERIALIZABLE does for `SELECT … FOR UPDATE`
//! - writes are staged and only become visible on commit, which re-checks
//!   the row versions it read
//!
//! Fault injection (`inject_conflicts`, `set_unavailable`, `set_commit_delay`)
//! and per-call counters make it the store of choice for engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::StoreError;
use super::store::{LedgerStore, LedgerTx};
use super::types::{Wallet, WalletId};

#[derive(Debug, Clone, Copy)]
struct CommittedRow {
    balance: i64,
    /// Commit sequence of the last writer
    version: u64,
    updated_at: DateTime<Utc>,
}

/// Snapshot of store call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub begins: u64,
    pub locks: u64,
    pub writes: u64,
    pub commits: u64,
    pub rollbacks: u64,
}

impl StoreStats {
    /// Total number of calls that reached the store
    pub fn total_calls(&self) -> u64 {
        self.reads + self.begins + self.locks + self.writes + self.commits
    }
}

#[derive(Default)]
struct Counters {
    reads: AtomicU64,
    begins: AtomicU64,
    locks: AtomicU64,
    writes: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
}

#[derive(Default)]
struct Inner {
    rows: DashMap<WalletId, CommittedRow>,
    row_locks: DashMap<WalletId, Arc<Mutex<()>>>,
    commit_seq: AtomicU64,
    snapshot_at_begin: bool,
    forced_conflicts: AtomicU32,
    unavailable: AtomicBool,
    commit_delay_ms: AtomicU64,
    counters: Counters,
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<Inner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take each transaction's snapshot at `begin_serializable`, so a
    /// transaction that queues on a row lock behind a committing peer gets
    /// `Conflict` (plain SERIALIZABLE without the advisory lock).
    pub fn with_snapshot_at_begin() -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshot_at_begin: true,
                ..Inner::default()
            }),
        }
    }

    /// Provision a wallet with an initial balance (replaces any existing row)
    pub fn insert_wallet(&self, id: WalletId, balance: i64) {
        self.inner.rows.insert(
            id,
            CommittedRow {
                balance,
                version: self.inner.commit_seq.load(Ordering::SeqCst),
                updated_at: Utc::now(),
            },
        );
        self.inner
            .row_locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())));
    }

    pub fn wallet(&self, id: WalletId) -> Option<Wallet> {
        self.inner.rows.get(&id).map(|row| Wallet {
            id,
            balance: row.balance,
            updated_at: row.updated_at,
        })
    }

    /// Make the next `n` commits fail with a serialization conflict
    pub fn inject_conflicts(&self, n: u32) {
        self.inner.forced_conflicts.store(n, Ordering::SeqCst);
    }

    /// Simulate a lost connection: every call fails with `Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every commit wait this long before it applies, like a slow
    /// COMMIT round-trip
    pub fn set_commit_delay(&self, delay: Duration) {
        self.inner
            .commit_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn stats(&self) -> StoreStats {
        let c = &self.inner.counters;
        StoreStats {
            reads: c.reads.load(Ordering::SeqCst),
            begins: c.begins.load(Ordering::SeqCst),
            locks: c.locks.load(Ordering::SeqCst),
            writes: c.writes.load(Ordering::SeqCst),
            commits: c.commits.load(Ordering::SeqCst),
            rollbacks: c.rollbacks.load(Ordering::SeqCst),
        }
    }
}

impl Inner {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Tx = MemoryLedgerTx;

    async fn read_balance(&self, id: WalletId) -> Result<i64, StoreError> {
        self.inner.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.check_available()?;
        self.inner
            .rows
            .get(&id)
            .map(|row| row.balance)
            .ok_or(StoreError::WalletNotFound(id))
    }

    async fn begin_serializable(&self) -> Result<MemoryLedgerTx, StoreError> {
        self.inner.counters.begins.fetch_add(1, Ordering::SeqCst);
        self.inner.check_available()?;
        let snapshot = self
            .inner
            .snapshot_at_begin
            .then(|| self.inner.commit_seq.load(Ordering::SeqCst));
        Ok(MemoryLedgerTx {
            inner: self.inner.clone(),
            snapshot,
            locked: HashMap::new(),
            staged: HashMap::new(),
            finished: false,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.check_available()
    }
}

struct LockedRow {
    _guard: OwnedMutexGuard<()>,
    version: u64,
    balance: i64,
}

pub struct MemoryLedgerTx {
    inner: Arc<Inner>,
    snapshot: Option<u64>,
    locked: HashMap<WalletId, LockedRow>,
    staged: HashMap<WalletId, i64>,
    finished: bool,
}

impl MemoryLedgerTx {
    async fn lock_row(&mut self, id: WalletId) -> Result<i64, StoreError> {
        if let Some(row) = self.locked.get(&id) {
            return Ok(self.staged.get(&id).copied().unwrap_or(row.balance));
        }

        let row_lock = self
            .inner
            .row_locks
            .get(&id)
            .map(|l| l.clone())
            .ok_or(StoreError::WalletNotFound(id))?;
        let guard = row_lock.lock_owned().await;

        // Read the committed row only once the lock is held
        let row = self
            .inner
            .rows
            .get(&id)
            .map(|r| *r)
            .ok_or(StoreError::WalletNotFound(id))?;

        let commit_seq = &self.inner.commit_seq;
        let snapshot = *self
            .snapshot
            .get_or_insert_with(|| commit_seq.load(Ordering::SeqCst));
        if row.version > snapshot {
            return Err(StoreError::Conflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }

        self.locked.insert(
            id,
            LockedRow {
                _guard: guard,
                version: row.version,
                balance: row.balance,
            },
        );
        Ok(row.balance)
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_and_read_balance(&mut self, id: WalletId) -> Result<i64, StoreError> {
        self.inner.counters.locks.fetch_add(1, Ordering::SeqCst);
        self.inner.check_available()?;
        self.lock_row(id).await
    }

    async fn write_balance(&mut self, id: WalletId, balance: i64) -> Result<(), StoreError> {
        self.inner.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.check_available()?;
        if balance < 0 {
            return Err(StoreError::Unavailable(format!(
                "check constraint violated: balance {balance} < 0"
            )));
        }
        self.lock_row(id).await?;
        self.staged.insert(id, balance);
        Ok(())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.inner.counters.commits.fetch_add(1, Ordering::SeqCst);
        let delay_ms = self.inner.commit_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        self.inner.check_available()?;

        if self.inner.take_forced_conflict() {
            return Err(StoreError::Conflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }

        for (id, locked) in &self.locked {
            let current = self.inner.rows.get(id).map(|r| r.version);
            if current != Some(locked.version) {
                return Err(StoreError::Conflict(format!(
                    "row {id} changed since it was read"
                )));
            }
        }

        let seq = self.inner.commit_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        for (id, balance) in std::mem::take(&mut self.staged) {
            if let Some(mut row) = self.inner.rows.get_mut(&id) {
                row.balance = balance;
                row.version = seq;
                row.updated_at = now;
            }
        }
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        self.inner.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.staged.clear();
        self.finished = true;
        Ok(())
    }
}

impl Drop for MemoryLedgerTx {
    fn drop(&mut self) {
        // Abandoned without commit/rollback: count it as an implicit rollback.
        // Row guards are released with `locked`.
        if !self.finished {
            self.inner.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
    }
}
