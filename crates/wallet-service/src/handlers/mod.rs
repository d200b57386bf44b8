//! API handlers.

pub mod health;
pub mod transactions;
pub mod users;

use serde::Serialize;

/// Balance after an accepted deposit or transaction.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// New balance.
    pub balance: f64,
}
