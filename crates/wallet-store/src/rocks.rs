//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use wallet_core::{Deposit, DepositId, Transaction, TransactionId, UserId, UserLedger};

use crate::batch::{BatchEntry, UpdateBatch};
use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

type Db = DBWithThreadMode<MultiThreaded>;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: RwLock<Option<Arc<Db>>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "Opened RocksDB store");

        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
        })
    }

    /// Get a handle to the open database.
    fn handle(&self) -> Result<Arc<Db>> {
        self.db.read().clone().ok_or(StoreError::Closed)
    }

    /// Get a column family handle.
    fn cf<'a>(db: &'a Db, name: &str) -> Result<Arc<BoundColumnFamily<'a>>> {
        db.cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Collect every `(id, value)` under a prefix of the history column family,
    /// ordered by numeric id.
    fn scan_history<T: serde::de::DeserializeOwned>(
        &self,
        prefix: &[u8],
    ) -> Result<Vec<(u64, T)>> {
        let db = self.handle()?;
        let cf_history = Self::cf(&db, cf::HISTORY)?;

        let mut records = Vec::new();
        let iter = db.iterator_cf(&cf_history, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(prefix) {
                break;
            }

            let id = keys::parse_child_id(&key, prefix)?;
            records.push((id, Self::deserialize(&value)?));
        }

        // Decimal keys sort lexicographically ("10" < "9")
        records.sort_by_key(|(id, _)| *id);
        Ok(records)
    }
}

impl Store for RocksStore {
    fn commit(&self, batch: &UpdateBatch) -> Result<()> {
        let db = self.handle()?;
        let cf_users = Self::cf(&db, cf::USERS)?;
        let cf_history = Self::cf(&db, cf::HISTORY)?;

        let mut write = WriteBatch::default();
        for entry in batch.entries() {
            match entry {
                BatchEntry::User { user_id, ledger } => {
                    write.put_cf(&cf_users, keys::user_key(*user_id), Self::serialize(ledger)?);
                }
                BatchEntry::Deposit {
                    user_id,
                    deposit_id,
                    deposit,
                } => {
                    write.put_cf(
                        &cf_history,
                        keys::deposit_key(*user_id, *deposit_id),
                        Self::serialize(deposit)?,
                    );
                }
                BatchEntry::Transaction {
                    user_id,
                    transaction_id,
                    transaction,
                } => {
                    write.put_cf(
                        &cf_history,
                        keys::transaction_key(*user_id, *transaction_id),
                        Self::serialize(transaction)?,
                    );
                }
            }
        }

        db.write(write)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(entries = batch.len(), "Committed batch");
        Ok(())
    }

    fn users(&self) -> Result<Vec<(UserId, UserLedger)>> {
        let db = self.handle()?;
        let cf_users = Self::cf(&db, cf::USERS)?;

        let mut users = Vec::new();
        for item in db.iterator_cf(&cf_users, IteratorMode::Start) {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            users.push((keys::parse_user_key(&key)?, Self::deserialize(&value)?));
        }

        Ok(users)
    }

    fn user(&self, user_id: UserId) -> Result<Option<UserLedger>> {
        let db = self.handle()?;
        let cf_users = Self::cf(&db, cf::USERS)?;

        db.get_cf(&cf_users, keys::user_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn deposits(&self, user_id: UserId) -> Result<Vec<(DepositId, Deposit)>> {
        let records = self.scan_history(&keys::deposits_prefix(user_id))?;
        Ok(records
            .into_iter()
            .map(|(id, deposit)| (DepositId::new(id), deposit))
            .collect())
    }

    fn transactions(&self, user_id: UserId) -> Result<Vec<(TransactionId, Transaction)>> {
        let records = self.scan_history(&keys::transactions_prefix(user_id))?;
        Ok(records
            .into_iter()
            .map(|(id, transaction)| (TransactionId::new(id), transaction))
            .collect())
    }

    fn close(&self) -> Result<()> {
        let Some(db) = self.db.write().take() else {
            return Err(StoreError::Closed);
        };

        for name in all_column_families() {
            let handle = Self::cf(&db, name)?;
            db.flush_cf(&handle)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tracing::debug!("Closed RocksDB store");
        Ok(())
    }
}
