//! Shared-token authentication.
//!
//! Every ledger request carries the configured secret in its JSON body. There are
//! no user accounts or sessions; a request either presents the token or is refused.

use crate::error::ApiError;
use crate::state::AppState;

/// Check the token presented in a request body.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] if the token does not match.
pub fn require_token(state: &AppState, token: &str) -> Result<(), ApiError> {
    if constant_time_eq(token, &state.config.shared_token) {
        Ok(())
    } else {
        tracing::debug!("Rejected request with wrong token");
        Err(ApiError::Unauthorized)
    }
}

/// Constant-time string comparison.
///
/// Returns early only on a length mismatch.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_works() {
        assert!(constant_time_eq("testtask", "testtask"));
        assert!(!constant_time_eq("testtask", "testtasq"));
        assert!(!constant_time_eq("testtask", "test"));
        assert!(constant_time_eq("", ""));
    }
}
