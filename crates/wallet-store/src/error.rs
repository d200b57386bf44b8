//! Error types for wallet storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored key could not be decoded.
    #[error("malformed key: {0:?}")]
    MalformedKey(String),

    /// The store was closed.
    #[error("store is closed")]
    Closed,

    /// A write was refused because failure injection is enabled.
    #[error("injected write failure")]
    InjectedFailure,
}
