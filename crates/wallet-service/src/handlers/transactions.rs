//! Bet and win handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use wallet_core::{TransactionId, UserId};

use super::BalanceResponse;
use crate::auth::require_token;
use crate::error::ApiError;
use crate::state::AppState;

/// Transaction request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Target user.
    pub user_id: UserId,
    /// Must be the user's bet count plus win count plus one.
    pub transaction_id: TransactionId,
    /// `Bet` or `Win`. Kept as a string so an unknown type is reported together
    /// with any other broken rule.
    #[serde(rename = "type")]
    pub kind: String,
    /// Amount to debit or credit.
    pub amount: f64,
    /// Shared token.
    pub token: String,
}

/// Apply a bet or win.
pub async fn apply_transaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    require_token(&state, &request.token)?;

    let balance = state.cache.apply_transaction(
        request.user_id,
        request.transaction_id,
        &request.kind,
        request.amount,
    )?;

    Ok(Json(BalanceResponse { balance }))
}
