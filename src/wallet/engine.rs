//! Balance Engine
//!
//! Runs one deposit/withdraw as a SERIALIZABLE transaction against a
//! [`LedgerStore`], retrying the whole attempt on store-detected conflicts.
//!
//! # Attempt
//!
//! ```text
//! BEGIN SERIALIZABLE → LOCK+READ → compute → WRITE → COMMIT
//! ```
//!
//! Any failure before COMMIT rolls the transaction back. Cancellation while
//! the attempt is staging drops the transaction handle, which also rolls
//! back. Once COMMIT is sent it runs to completion and its real outcome is
//! reported: a canceled caller never sees an error for a committed mutation.
//!
//! The engine holds no in-process lock and does not log: all coordination
//! happens in the store, all reporting happens in the caller.

use super::context::CallContext;
use super::error::WalletError;
use super::retry::{AttemptState, RetryPolicy};
use super::store::{LedgerStore, LedgerTx};
use super::types::{OperationKind, WalletId};

pub struct BalanceEngine<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S: LedgerStore> BalanceEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_policy(store, RetryPolicy::default())
    }

    pub fn with_policy(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Apply an operation given by its wire literal (`"DEPOSIT"` / `"WITHDRAW"`).
    ///
    /// The amount is validated before the kind, and both before any store call.
    pub async fn operate(
        &self,
        ctx: &CallContext,
        id: WalletId,
        kind: &str,
        amount: i64,
    ) -> Result<i64, WalletError> {
        validate_amount(amount)?;
        let kind: OperationKind = kind.parse()?;
        self.apply(ctx, id, kind, amount).await
    }

    /// Deposit into or withdraw from a wallet, returning the new balance.
    pub async fn apply(
        &self,
        ctx: &CallContext,
        id: WalletId,
        kind: OperationKind,
        amount: i64,
    ) -> Result<i64, WalletError> {
        validate_amount(amount)?;
        ctx.check()?;

        let mut attempt = 1;
        loop {
            let staged = tokio::select! {
                biased;
                abandoned = ctx.done() => return Err(abandoned),
                staged = self.stage(id, kind, amount) => staged,
            };
            let outcome = match staged {
                Ok((tx, balance)) => tx
                    .commit()
                    .await
                    .map(|()| balance)
                    .map_err(WalletError::from),
                Err(e) => Err(e),
            };

            match self.policy.next_state(attempt, outcome) {
                AttemptState::Succeeded(balance) => return Ok(balance),
                AttemptState::Failed(e) => return Err(e),
                AttemptState::Retrying {
                    next_attempt,
                    delay,
                } => {
                    tokio::select! {
                        biased;
                        abandoned = ctx.done() => return Err(abandoned),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt = next_attempt;
                }
            }
        }
    }

    /// Last committed balance. No lock, may trail an in-flight mutation.
    pub async fn balance(&self, id: WalletId) -> Result<i64, WalletError> {
        Ok(self.store.read_balance(id).await?)
    }

    /// Begin, lock, compute and write. Returns the open transaction ready
    /// to commit.
    async fn stage(
        &self,
        id: WalletId,
        kind: OperationKind,
        amount: i64,
    ) -> Result<(S::Tx, i64), WalletError> {
        let mut tx = self.store.begin_serializable().await?;

        match mutate(&mut tx, id, kind, amount).await {
            Ok(balance) => Ok((tx, balance)),
            Err(e) => {
                // `e` is the outcome. A failed ROLLBACK needs no handling: the
                // store discards the transaction with its handle, as on drop.
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    }
}

async fn mutate<T: LedgerTx>(
    tx: &mut T,
    id: WalletId,
    kind: OperationKind,
    amount: i64,
) -> Result<i64, WalletError> {
    let current = tx.lock_and_read_balance(id).await?;
    let next = kind.apply_to(current, amount)?;
    tx.write_balance(id, next).await?;
    Ok(next)
}

fn validate_amount(amount: i64) -> Result<(), WalletError> {
    if amount <= 0 {
        return Err(WalletError::InvalidArgument(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::memory_store::MemoryLedger;

    fn engine_with(balance: i64) -> (BalanceEngine<MemoryLedger>, WalletId) {
        let store = MemoryLedger::new();
        let id = WalletId::random();
        store.insert_wallet(id, balance);
        (BalanceEngine::new(store), id)
    }

    #[tokio::test]
    async fn test_deposit_and_withdraw() {
        let (engine, id) = engine_with(50);
        let ctx = CallContext::background();

        assert_eq!(
            engine
                .apply(&ctx, id, OperationKind::Deposit, 100)
                .await
                .unwrap(),
            150
        );
        assert_eq!(
            engine
                .apply(&ctx, id, OperationKind::Withdraw, 150)
                .await
                .unwrap(),
            0
        );
        assert_eq!(engine.balance(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_funds_rolls_back() {
        let (engine, id) = engine_with(100);
        let ctx = CallContext::background();

        let err = engine
            .apply(&ctx, id, OperationKind::Withdraw, 200)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WalletError::InsufficientFunds {
                balance: 100,
                requested: 200
            }
        );

        let stats = engine.store().stats();
        assert_eq!(stats.begins, 1, "business failures are not retried");
        assert_eq!(stats.writes, 0);
        assert_eq!(stats.rollbacks, 1);
        assert_eq!(engine.balance(id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_missing_wallet_not_retried() {
        let engine = BalanceEngine::new(MemoryLedger::new());
        let id = WalletId::random();

        let err = engine
            .apply(&CallContext::background(), id, OperationKind::Deposit, 1)
            .await
            .unwrap_err();
        assert_eq!(err, WalletError::NotFound(id));
        assert_eq!(engine.store().stats().begins, 1);
        assert_eq!(engine.balance(id).await, Err(WalletError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount_without_store_calls() {
        let (engine, id) = engine_with(10);
        let ctx = CallContext::background();

        for (kind, amount) in [("DEPOSIT", 0), ("WITHDRAW", -5)] {
            let err = engine.operate(&ctx, id, kind, amount).await.unwrap_err();
            assert!(matches!(err, WalletError::InvalidArgument(_)));
        }
        // Amount is checked before the kind
        let err = engine.operate(&ctx, id, "TRANSFER", 0).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidArgument(_)));

        assert_eq!(engine.store().stats().total_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let (engine, id) = engine_with(10);
        let err = engine
            .operate(&CallContext::background(), id, "TRANSFER", 10)
            .await
            .unwrap_err();
        assert_eq!(err, WalletError::UnknownOperation("TRANSFER".into()));
        assert_eq!(engine.store().stats().total_calls(), 0);
        assert_eq!(engine.balance(id).await.unwrap(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflict_then_success() {
        let (engine, id) = engine_with(10);
        engine.store().inject_conflicts(2);

        let balance = engine
            .apply(&CallContext::background(), id, OperationKind::Deposit, 5)
            .await
            .unwrap();
        assert_eq!(balance, 15);
        assert_eq!(engine.store().stats().begins, 3);
        assert_eq!(engine.store().stats().commits, 3);
    }

    #[tokio::test]
    async fn test_store_unavailable_not_retried() {
        let (engine, id) = engine_with(10);
        engine.store().set_unavailable(true);

        let err = engine
            .apply(&CallContext::background(), id, OperationKind::Deposit, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::StoreUnavailable(_)));
        assert_eq!(engine.store().stats().begins, 1);
    }

    #[tokio::test]
    async fn test_expired_context_rejected_before_store() {
        let (engine, id) = engine_with(10);
        let (ctx, handle) = CallContext::background().cancelable();
        handle.cancel();

        let err = engine
            .apply(&ctx, id, OperationKind::Deposit, 5)
            .await
            .unwrap_err();
        assert_eq!(err, WalletError::Canceled);
        assert_eq!(engine.store().stats().total_calls(), 0);
    }
}
