//! Error types for ledger operations.
//!
//! Validation is collect-all: every applicable rule is checked and each broken rule
//! becomes one [`Violation`]. A [`Rejection`] carries them in check order so callers
//! can branch on specific kinds without matching on message text.

use std::fmt;

use serde::Serialize;

/// A single broken validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Violation {
    /// A user with this id already exists.
    #[error("user already exists")]
    AlreadyExists,

    /// No user with this id exists.
    #[error("user not found")]
    NotFound,

    /// The deposit or transaction id is not the next one in the user's sequence.
    ///
    /// Duplicates and gaps are not distinguished.
    #[error("out of sequence: expected id {expected}, received {received}")]
    OutOfSequence {
        /// The id that would have been accepted.
        expected: u64,
        /// The id that was supplied.
        received: u64,
    },

    /// The transaction type is neither `Bet` nor `Win`.
    #[error("invalid transaction type: {0:?}")]
    InvalidType(String),

    /// The amount is not a finite, strictly positive number.
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),

    /// A bet would leave the balance at zero or below.
    #[error("insufficient funds: balance={balance}, amount={amount}")]
    InsufficientFunds {
        /// Balance at the time of the bet.
        balance: f64,
        /// Requested bet amount.
        amount: f64,
    },

    /// A new user was requested with a non-zero starting balance.
    #[error("invalid initial balance: {0}")]
    InvalidInitialBalance(f64),
}

impl Violation {
    /// Stable machine-readable code for this violation.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::OutOfSequence { .. } => "out_of_sequence",
            Self::InvalidType(_) => "invalid_type",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidInitialBalance(_) => "invalid_initial_balance",
        }
    }
}

/// A rejected operation: one or more violations, in the order they were checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    violations: Vec<Violation>,
}

impl Rejection {
    /// Build a rejection from collected violations.
    ///
    /// Returns `None` when nothing was violated, so validators can end with
    /// `Rejection::from_violations(found).map_or(Ok(..), Err)`.
    #[must_use]
    pub fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    /// The violated rules, in check order.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Whether a violation with the given kind code is present.
    #[must_use]
    pub fn has(&self, kind: &str) -> bool {
        self.violations.iter().any(|v| v.kind() == kind)
    }

    /// Kind codes of all violations, in check order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&'static str> {
        self.violations.iter().map(Violation::kind).collect()
    }
}

impl From<Violation> for Rejection {
    fn from(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Rejection {}
