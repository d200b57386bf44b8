//! Deposit and transaction records.
//!
//! These are the per-operation detail entries kept in a user's child namespace.
//! They are built by the ledger cache when an operation is accepted and live in
//! memory only until the next successful flush.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Violation;

/// An accepted deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    /// Balance before the deposit was applied.
    pub balance_before: f64,

    /// Balance after the deposit was applied.
    pub balance_after: f64,

    /// When the deposit was accepted.
    pub timestamp: DateTime<Utc>,
}

impl Deposit {
    /// Record a deposit of `amount` on top of `balance_before`.
    #[must_use]
    pub fn new(balance_before: f64, amount: f64) -> Self {
        Self {
            balance_before,
            balance_after: balance_before + amount,
            timestamp: Utc::now(),
        }
    }
}

/// An accepted bet or win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Bet or win.
    pub kind: TransactionType,

    /// Signed balance change: negative for a bet, positive for a win.
    pub diff: f64,

    /// Balance before the transaction was applied.
    pub balance_before: f64,

    /// Balance after the transaction was applied.
    pub balance_after: f64,

    /// When the transaction was accepted.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Record a transaction of `amount` (unsigned) on top of `balance_before`.
    #[must_use]
    pub fn new(kind: TransactionType, balance_before: f64, amount: f64) -> Self {
        let diff = kind.signed(amount);
        Self {
            kind,
            diff,
            balance_before,
            balance_after: balance_before + diff,
            timestamp: Utc::now(),
        }
    }
}

/// Type of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money staked by the user; decreases the balance.
    Bet,

    /// Money paid out to the user; increases the balance.
    Win,
}

impl TransactionType {
    /// Apply this type's sign to an unsigned amount.
    #[must_use]
    pub fn signed(self, amount: f64) -> f64 {
        match self {
            Self::Bet => -amount,
            Self::Win => amount,
        }
    }

    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bet => "Bet",
            Self::Win => "Win",
        }
    }
}

impl FromStr for TransactionType {
    type Err = Violation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Bet" => Ok(Self::Bet),
            "Win" => Ok(Self::Win),
            other => Err(Violation::InvalidType(other.to_string())),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
