//! Database schema definitions and column families.
//!
//! The root collection of users maps to the `users` column family. Every user's
//! child namespace (deposits and transactions) lives in the shared `history`
//! column family under the key prefix produced by [`crate::keys::user_namespace`].

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User aggregates, keyed by decimal user id.
    pub const USERS: &str = "users";

    /// Per-user deposit and transaction detail, keyed by `user_<id>/<kind>/<id>`.
    pub const HISTORY: &str = "history";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::USERS, cf::HISTORY]
}
