//! Wallet ledger service.
//!
//! This crate provides the in-memory wallet ledger and its HTTP API:
//!
//! - Per-user records with their own lock, validated with collect-all rules
//! - Periodic write-back of dirty records in atomic batches
//! - Recovery of user aggregates from storage at startup
//! - A final flush on shutdown
//!
//! # Authentication
//!
//! Every ledger request carries a shared token in its JSON body, compared
//! against the configured secret.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for axum even when they never await

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::{ApiError, ServiceError};
pub use ledger::{Ledger, LedgerCache, LedgerOptions};
pub use routes::create_router;
pub use state::AppState;
