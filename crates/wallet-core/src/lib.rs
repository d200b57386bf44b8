//! Core types for the wallet ledger service.
//!
//! This crate provides the foundational types shared by the store and the service:
//!
//! - **Identifiers**: `UserId`, `DepositId`, `TransactionId`
//! - **Ledger**: `UserLedger`, `UserSnapshot`
//! - **History**: `Deposit`, `Transaction`, `TransactionType`
//! - **Errors**: `Violation`, `Rejection`
//!
//! # Sequencing
//!
//! Deposit and transaction ids are supplied by the caller and must be contiguous
//! per user, starting at 1. Deposits have their own sequence; bets and wins share
//! one transaction sequence.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod history;
pub mod ids;
pub mod ledger;

pub use error::{Rejection, Violation};
pub use history::{Deposit, Transaction, TransactionType};
pub use ids::{DepositId, IdError, TransactionId, UserId};
pub use ledger::{UserLedger, UserSnapshot};
