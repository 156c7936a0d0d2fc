//! Wallet Error Types
//!
//! Two layers:
//! - [`StoreError`]: what a ledger store reports
//! - [`WalletError`]: what the balance engine returns to its callers

use thiserror::Error;

use super::types::WalletId;

/// Ledger store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    /// Serialization anomaly detected by the store (retryable)
    #[error("Serialization conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// SQLSTATE serialization_failure
const PG_SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE deadlock_detected
const PG_DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let conflict = match &e {
            sqlx::Error::Database(db) => matches!(
                db.code().as_deref(),
                Some(PG_SERIALIZATION_FAILURE | PG_DEADLOCK_DETECTED)
            ),
            _ => false,
        };
        if conflict {
            StoreError::Conflict(e.to_string())
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }
}

/// Balance engine error taxonomy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet not found: {0}")]
    NotFound(WalletId),

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Operation canceled")]
    Canceled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl WalletError {
    /// Only store-detected conflicts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Conflict(_))
    }

    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            WalletError::NotFound(_) => "WALLET_NOT_FOUND",
            WalletError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            WalletError::UnknownOperation(_) => "UNKNOWN_OPERATION",
            WalletError::InvalidArgument(_) => "INVALID_ARGUMENT",
            WalletError::Conflict(_) => "CONFLICT",
            WalletError::Canceled => "CANCELED",
            WalletError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            WalletError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            WalletError::NotFound(_) => 404,
            WalletError::InsufficientFunds { .. }
            | WalletError::UnknownOperation(_)
            | WalletError::InvalidArgument(_) => 400,
            WalletError::Canceled | WalletError::DeadlineExceeded => 504,
            WalletError::Conflict(_) | WalletError::StoreUnavailable(_) => 500,
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::WalletNotFound(id) => WalletError::NotFound(id),
            StoreError::Conflict(msg) => WalletError::Conflict(msg),
            StoreError::Unavailable(msg) => WalletError::StoreUnavailable(msg),
        }
    }
}
