//! User handlers: create, read and deposit.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use wallet_core::{DepositId, Rejection, UserId, UserSnapshot, Violation};

use super::BalanceResponse;
use crate::auth::require_token;
use crate::error::ApiError;
use crate::state::AppState;

/// Create user request.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// New user's id.
    pub id: UserId,
    /// Starting balance; only zero is accepted.
    #[serde(default)]
    pub balance: f64,
    /// Shared token.
    pub token: String,
}

/// Get user request.
#[derive(Debug, Deserialize)]
pub struct GetUserRequest {
    /// User id.
    pub id: UserId,
    /// Shared token.
    pub token: String,
}

/// Deposit request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    /// Target user.
    pub user_id: UserId,
    /// Must be the user's deposit count plus one.
    pub deposit_id: DepositId,
    /// Amount to credit.
    pub amount: f64,
    /// Shared token.
    pub token: String,
}

/// Create a user with a zero balance.
///
/// An existing id and a non-zero starting balance are both reported, in that
/// order, when both apply.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserSnapshot>, ApiError> {
    require_token(&state, &request.token)?;

    let mut violations = Vec::new();
    if state.cache.contains(request.id) {
        violations.push(Violation::AlreadyExists);
    }
    if request.balance != 0.0 {
        violations.push(Violation::InvalidInitialBalance(request.balance));
    }
    if let Some(rejection) = Rejection::from_violations(violations) {
        return Err(rejection.into());
    }

    // The id may have been taken since the check above
    state.cache.create_user(request.id, 0.0)?;

    Ok(Json(state.cache.get_user(request.id)?))
}

/// Get a user's aggregate counters.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GetUserRequest>,
) -> Result<Json<UserSnapshot>, ApiError> {
    require_token(&state, &request.token)?;

    Ok(Json(state.cache.get_user(request.id)?))
}

/// Apply a deposit.
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    require_token(&state, &request.token)?;

    let balance = state
        .cache
        .apply_deposit(request.user_id, request.deposit_id, request.amount)?;

    Ok(Json(BalanceResponse { balance }))
}
