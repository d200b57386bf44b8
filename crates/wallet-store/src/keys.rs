//! Key encoding utilities.
//!
//! All identifiers are encoded as decimal strings. A user's child namespace is the
//! prefix `user_<id>/`; the trailing slash keeps `user_1/` from matching `user_12/`.

use wallet_core::{DepositId, TransactionId, UserId};

use crate::error::{Result, StoreError};

/// Prefix shared by every child namespace.
pub const USER_NAMESPACE_PREFIX: &str = "user_";

const DEPOSIT_SCOPE: &str = "deposit/";
const TRANSACTION_SCOPE: &str = "tx/";

/// Create a user key for the root namespace.
#[must_use]
pub fn user_key(user_id: UserId) -> Vec<u8> {
    user_id.to_string().into_bytes()
}

/// Decode a user key from the root namespace.
///
/// # Errors
///
/// Returns `StoreError::MalformedKey` if the key is not a decimal id.
pub fn parse_user_key(key: &[u8]) -> Result<UserId> {
    let text = std::str::from_utf8(key).map_err(|_| malformed(key))?;
    text.parse().map_err(|_| malformed(key))
}

/// Name of a user's child namespace.
#[must_use]
pub fn user_namespace(user_id: UserId) -> String {
    format!("{USER_NAMESPACE_PREFIX}{user_id}/")
}

/// Prefix for iterating a user's deposits.
#[must_use]
pub fn deposits_prefix(user_id: UserId) -> Vec<u8> {
    format!("{}{DEPOSIT_SCOPE}", user_namespace(user_id)).into_bytes()
}

/// Prefix for iterating a user's transactions.
#[must_use]
pub fn transactions_prefix(user_id: UserId) -> Vec<u8> {
    format!("{}{TRANSACTION_SCOPE}", user_namespace(user_id)).into_bytes()
}

/// Create a deposit key: `user_<id>/deposit/<deposit id>`.
#[must_use]
pub fn deposit_key(user_id: UserId, deposit_id: DepositId) -> Vec<u8> {
    let mut key = deposits_prefix(user_id);
    key.extend_from_slice(deposit_id.to_string().as_bytes());
    key
}

/// Create a transaction key: `user_<id>/tx/<transaction id>`.
#[must_use]
pub fn transaction_key(user_id: UserId, transaction_id: TransactionId) -> Vec<u8> {
    let mut key = transactions_prefix(user_id);
    key.extend_from_slice(transaction_id.to_string().as_bytes());
    key
}

/// Extract the trailing decimal id from a key under `prefix`.
///
/// # Errors
///
/// Returns `StoreError::MalformedKey` if the key does not start with `prefix` or
/// the remainder is not a decimal id.
pub fn parse_child_id(key: &[u8], prefix: &[u8]) -> Result<u64> {
    let rest = key.strip_prefix(prefix).ok_or_else(|| malformed(key))?;
    std::str::from_utf8(rest)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| malformed(key))
}

fn malformed(key: &[u8]) -> StoreError {
    StoreError::MalformedKey(String::from_utf8_lossy(key).into_owned())
}
