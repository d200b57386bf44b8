//! Durable storage layer for the wallet ledger.
//!
//! The ledger itself lives in memory; this crate is where it is written back to and
//! recovered from. The layout has one root collection of user aggregates and one
//! child namespace per user holding that user's deposits and transactions.
//!
//! # Backends
//!
//! - [`RocksStore`]: `RocksDB` with a `users` and a `history` column family
//! - [`MemoryStore`]: in-process maps, used in tests (supports write-failure injection)
//!
//! # Example
//!
//! ```no_run
//! use wallet_core::{UserId, UserLedger};
//! use wallet_store::{RocksStore, Store, UpdateBatch};
//!
//! let store = RocksStore::open("/tmp/wallet-db").unwrap();
//!
//! let mut batch = UpdateBatch::new();
//! batch.put_user(UserId::new(1), UserLedger::new(0.0));
//! store.commit(&batch).unwrap();
//!
//! let users = store.users().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod batch;
pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use batch::{BatchEntry, UpdateBatch};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use wallet_core::{Deposit, DepositId, Transaction, TransactionId, UserId, UserLedger};

/// The storage trait defining all durable operations.
///
/// Writes only happen through [`Store::commit`], which applies a whole batch or
/// nothing.
pub trait Store: Send + Sync {
    /// Apply every entry of the batch atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; in that case nothing was applied.
    fn commit(&self, batch: &UpdateBatch) -> Result<()>;

    /// Iterate the root namespace: every persisted user aggregate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read or decoding fails.
    fn users(&self) -> Result<Vec<(UserId, UserLedger)>>;

    /// Get one persisted user aggregate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read or decoding fails.
    fn user(&self, user_id: UserId) -> Result<Option<UserLedger>>;

    /// List a user's persisted deposits in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read or decoding fails.
    fn deposits(&self, user_id: UserId) -> Result<Vec<(DepositId, Deposit)>>;

    /// List a user's persisted transactions in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read or decoding fails.
    fn transactions(&self, user_id: UserId) -> Result<Vec<(TransactionId, Transaction)>>;

    /// Flush and release the underlying storage.
    ///
    /// Every later call fails with `StoreError::Closed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    fn close(&self) -> Result<()>;
}
