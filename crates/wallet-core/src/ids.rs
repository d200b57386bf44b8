//! Identifier types for the wallet ledger.
//!
//! All identifiers are assigned by the caller. They are plain unsigned integers that
//! render and parse as decimal strings, which is also how they are encoded as
//! storage keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! decimal_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create an identifier from its numeric value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Return the numeric value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>()
                    .map(Self)
                    .map_err(|_| IdError::InvalidDecimal(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

decimal_id! {
    /// A user identifier.
    ///
    /// Unique for the lifetime of the ledger and never reused.
    UserId
}

decimal_id! {
    /// A deposit identifier, contiguous per user starting at 1.
    DepositId
}

decimal_id! {
    /// A transaction identifier, contiguous per user starting at 1.
    ///
    /// Bets and wins share the same sequence.
    TransactionId
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not an unsigned decimal integer.
    #[error("invalid decimal identifier: {0:?}")]
    InvalidDecimal(String),
}
