//! Wallet domain types
//!
//! - [`WalletId`]: opaque UUID identifier, assigned by provisioning
//! - [`OperationKind`]: the closed set of balance mutations
//! - [`Wallet`]: the persisted row

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::WalletError;

/// Wallet identifier (UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Random id, for provisioning and tests
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for WalletId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for WalletId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Balance mutation kind
///
/// Wire form is the upper-case literal (`DEPOSIT` / `WITHDRAW`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "DEPOSIT",
            OperationKind::Withdraw => "WITHDRAW",
        }
    }

    /// Compute the balance that results from applying `amount` to `current`.
    ///
    /// `amount` is assumed positive. A withdraw that would take the balance
    /// below zero yields `InsufficientFunds`.
    pub fn apply_to(&self, current: i64, amount: i64) -> Result<i64, WalletError> {
        match self {
            OperationKind::Deposit => current
                .checked_add(amount)
                .ok_or_else(|| WalletError::InvalidArgument("deposit overflows balance".into())),
            OperationKind::Withdraw => {
                if amount > current {
                    Err(WalletError::InsufficientFunds {
                        balance: current,
                        requested: amount,
                    })
                } else {
                    Ok(current - amount)
                }
            }
        }
    }
}

impl FromStr for OperationKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(OperationKind::Deposit),
            "WITHDRAW" => Ok(OperationKind::Withdraw),
            other => Err(WalletError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted wallet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub id: WalletId,
    /// Minor units, never negative
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}
