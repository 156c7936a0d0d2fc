use std::time::Duration;

use crate::wallet::{BalanceEngine, LedgerStore};

/// Gateway shared state
pub struct AppState<S> {
    pub engine: BalanceEngine<S>,
    /// Deadline for each mutation request
    pub request_timeout: Duration,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(engine: BalanceEngine<S>, request_timeout: Duration) -> Self {
        Self {
            engine,
            request_timeout,
        }
    }
}
