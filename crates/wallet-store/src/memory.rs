//! In-memory storage implementation.
//!
//! Behaves like the `RocksDB` backend (atomic batches, numeric ordering, close) but
//! keeps everything in process. Writes can be made to fail on demand so callers can
//! exercise their retry paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use wallet_core::{Deposit, DepositId, Transaction, TransactionId, UserId, UserLedger};

use crate::batch::{BatchEntry, UpdateBatch};
use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserLedger>,
    deposits: BTreeMap<(UserId, DepositId), Deposit>,
    transactions: BTreeMap<(UserId, TransactionId), Transaction>,
}

/// In-memory storage implementation.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Option<Tables>>,
    fail_writes: AtomicBool,
    commits: AtomicU64,
}

impl MemoryStore {
    /// Create an empty, open store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Some(Tables::default())),
            fail_writes: AtomicBool::new(false),
            commits: AtomicU64::new(0),
        }
    }

    /// Make every following `commit` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Result<T> {
        let mut guard = self.tables.lock();
        let tables = guard.as_mut().ok_or(StoreError::Closed)?;
        Ok(f(tables))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn commit(&self, batch: &UpdateBatch) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::InjectedFailure);
        }

        self.with_tables(|tables| {
            for entry in batch.entries() {
                match entry.clone() {
                    BatchEntry::User { user_id, ledger } => {
                        tables.users.insert(user_id, ledger);
                    }
                    BatchEntry::Deposit {
                        user_id,
                        deposit_id,
                        deposit,
                    } => {
                        tables.deposits.insert((user_id, deposit_id), deposit);
                    }
                    BatchEntry::Transaction {
                        user_id,
                        transaction_id,
                        transaction,
                    } => {
                        tables
                            .transactions
                            .insert((user_id, transaction_id), transaction);
                    }
                }
            }
        })?;

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn users(&self) -> Result<Vec<(UserId, UserLedger)>> {
        self.with_tables(|tables| tables.users.iter().map(|(k, v)| (*k, *v)).collect())
    }

    fn user(&self, user_id: UserId) -> Result<Option<UserLedger>> {
        self.with_tables(|tables| tables.users.get(&user_id).copied())
    }

    fn deposits(&self, user_id: UserId) -> Result<Vec<(DepositId, Deposit)>> {
        self.with_tables(|tables| {
            tables
                .deposits
                .range((user_id, DepositId::new(0))..=(user_id, DepositId::new(u64::MAX)))
                .map(|((_, id), deposit)| (*id, deposit.clone()))
                .collect()
        })
    }

    fn transactions(&self, user_id: UserId) -> Result<Vec<(TransactionId, Transaction)>> {
        self.with_tables(|tables| {
            tables
                .transactions
                .range(
                    (user_id, TransactionId::new(0))..=(user_id, TransactionId::new(u64::MAX)),
                )
                .map(|((_, id), transaction)| (*id, transaction.clone()))
                .collect()
        })
    }

    fn close(&self) -> Result<()> {
        self.tables
            .lock()
            .take()
            .map(|_| ())
            .ok_or(StoreError::Closed)
    }
}
