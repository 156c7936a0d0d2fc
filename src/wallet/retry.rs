//! Conflict retry policy
//!
//! # State Machine
//!
//! ```text
//! Attempting ──ok──────────────▶ Succeeded
//!     │
//!     ├──conflict, attempts left──▶ Retrying(delay) ──▶ Attempting
//!     │
//!     └──terminal / exhausted─────▶ Failed
//! ```
//!
//! Backoff is linear: the retry after attempt `n` waits `n × base_delay`.

use std::time::Duration;

use super::error::WalletError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// Next step after an attempt has finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Succeeded(i64),
    Retrying { next_attempt: u32, delay: Duration },
    Failed(WalletError),
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Sleep before the attempt that follows attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Classify the outcome of attempt number `attempt` (1-based).
    pub fn next_state(&self, attempt: u32, outcome: Result<i64, WalletError>) -> AttemptState {
        match outcome {
            Ok(balance) => AttemptState::Succeeded(balance),
            Err(e) if e.is_retryable() && attempt < self.max_attempts => AttemptState::Retrying {
                next_attempt: attempt + 1,
                delay: self.backoff(attempt),
            },
            Err(e) => AttemptState::Failed(e),
        }
    }
}
