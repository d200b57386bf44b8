//! The authoritative in-memory ledger.
//!
//! Maps user ids to their [`LedgerRecord`]. Records are inserted once and never
//! removed. Every operation looks the record up under a short read lock on the
//! map, releases it, and then works under that record's own lock, so different
//! users never contend with each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use wallet_core::{
    DepositId, Rejection, TransactionId, UserId, UserLedger, UserSnapshot, Violation,
};

use super::record::LedgerRecord;

/// In-memory map of user id to ledger record.
#[derive(Debug, Default)]
pub struct LedgerCache {
    records: RwLock<HashMap<UserId, Arc<LedgerRecord>>>,
    /// Set by every accepted mutation, cleared by the flush pass.
    changed: AtomicBool,
    /// Held for the whole of a flush pass so passes never overlap.
    flush_lock: Mutex<()>,
}

impl LedgerCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a user with the given starting balance.
    ///
    /// Any starting value is accepted here; callers enforce their own policy.
    ///
    /// # Errors
    ///
    /// Rejects with `AlreadyExists` if the id is taken.
    pub fn create_user(&self, user_id: UserId, initial_balance: f64) -> Result<(), Rejection> {
        {
            let mut records = self.records.write();
            if records.contains_key(&user_id) {
                tracing::debug!(user_id = %user_id, "Rejected duplicate user");
                return Err(Violation::AlreadyExists.into());
            }
            records.insert(
                user_id,
                Arc::new(LedgerRecord::created(user_id, initial_balance)),
            );
        }
        self.mark_changed();

        tracing::info!(user_id = %user_id, initial_balance, "User created");
        Ok(())
    }

    /// Get a copy of a user's counters.
    ///
    /// # Errors
    ///
    /// Rejects with `NotFound` if the user does not exist.
    pub fn get_user(&self, user_id: UserId) -> Result<UserSnapshot, Rejection> {
        Ok(self.record(user_id)?.snapshot())
    }

    /// Apply a deposit and return the new balance.
    ///
    /// # Errors
    ///
    /// Rejects with `NotFound`, or with every broken rule among `OutOfSequence`
    /// and `InvalidAmount`.
    pub fn apply_deposit(
        &self,
        user_id: UserId,
        deposit_id: DepositId,
        amount: f64,
    ) -> Result<f64, Rejection> {
        let record = self.record(user_id)?;

        match record.apply_deposit(deposit_id, amount) {
            Ok(balance) => {
                self.mark_changed();
                tracing::debug!(
                    user_id = %user_id,
                    deposit_id = %deposit_id,
                    amount,
                    balance,
                    "Deposit applied"
                );
                Ok(balance)
            }
            Err(rejection) => {
                tracing::debug!(
                    user_id = %user_id,
                    deposit_id = %deposit_id,
                    reason = %rejection,
                    "Deposit rejected"
                );
                Err(rejection)
            }
        }
    }

    /// Apply a bet or win and return the new balance.
    ///
    /// # Errors
    ///
    /// Rejects with `NotFound`, or with every broken rule among `InvalidType`,
    /// `OutOfSequence`, `InvalidAmount` and `InsufficientFunds`.
    pub fn apply_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
        kind: &str,
        amount: f64,
    ) -> Result<f64, Rejection> {
        let record = self.record(user_id)?;

        match record.apply_transaction(transaction_id, kind, amount) {
            Ok(balance) => {
                self.mark_changed();
                tracing::debug!(
                    user_id = %user_id,
                    transaction_id = %transaction_id,
                    kind,
                    amount,
                    balance,
                    "Transaction applied"
                );
                Ok(balance)
            }
            Err(rejection) => {
                tracing::debug!(
                    user_id = %user_id,
                    transaction_id = %transaction_id,
                    reason = %rejection,
                    "Transaction rejected"
                );
                Err(rejection)
            }
        }
    }

    /// Whether a user exists.
    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.records.read().contains_key(&user_id)
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether there are no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Whether anything changed since the last flush pass started.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Insert a clean record loaded from storage.
    pub(crate) fn insert_recovered(&self, user_id: UserId, ledger: UserLedger) {
        self.records
            .write()
            .insert(user_id, Arc::new(LedgerRecord::recovered(user_id, ledger)));
    }

    /// Enter the single flush section.
    pub(crate) fn flush_guard(&self) -> MutexGuard<'_, ()> {
        self.flush_lock.lock()
    }

    /// Clear the changed flag, returning whether it was set.
    pub(crate) fn take_changes(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }

    /// Records with unflushed changes.
    pub(crate) fn dirty_records(&self) -> Vec<Arc<LedgerRecord>> {
        self.records
            .read()
            .values()
            .filter(|record| record.is_dirty())
            .cloned()
            .collect()
    }

    pub(crate) fn record(&self, user_id: UserId) -> Result<Arc<LedgerRecord>, Rejection> {
        self.records
            .read()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Violation::NotFound.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn cache_with_user(id: u64) -> LedgerCache {
        let cache = LedgerCache::new();
        cache.create_user(UserId::new(id), 0.0).unwrap();
        cache
    }

    #[test]
    fn scenario_create_and_get() {
        let cache = cache_with_user(1);
        let snapshot = cache.get_user(UserId::new(1)).unwrap();

        assert_eq!(snapshot.balance, 0.0);
        assert_eq!(snapshot.deposit_count, 0);
        assert_eq!(snapshot.bet_count, 0);
        assert_eq!(snapshot.win_count, 0);
        assert!(cache.has_changes());
    }

    #[test]
    fn duplicate_user_rejected() {
        let cache = cache_with_user(1);
        let rejection = cache.create_user(UserId::new(1), 0.0).unwrap_err();
        assert_eq!(rejection.violations(), &[Violation::AlreadyExists]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_user_is_not_found_for_every_operation() {
        let cache = LedgerCache::new();
        let id = UserId::new(404);

        assert!(cache.get_user(id).unwrap_err().has("not_found"));
        assert!(cache
            .apply_deposit(id, DepositId::new(1), 1.0)
            .unwrap_err()
            .has("not_found"));
        assert!(cache
            .apply_transaction(id, TransactionId::new(1), "Win", 1.0)
            .unwrap_err()
            .has("not_found"));
        assert!(!cache.has_changes());
    }

    #[test]
    fn scenarios_deposit_bet_win() {
        let cache = cache_with_user(1);
        let id = UserId::new(1);

        // B
        assert_eq!(cache.apply_deposit(id, DepositId::new(1), 100.0).unwrap(), 100.0);
        let replay = cache.apply_deposit(id, DepositId::new(1), 50.0).unwrap_err();
        assert!(replay.has("out_of_sequence"));
        assert_eq!(cache.get_user(id).unwrap().balance, 100.0);

        // C
        let bet = cache
            .apply_transaction(id, TransactionId::new(1), "Bet", 100.0)
            .unwrap_err();
        assert!(bet.has("insufficient_funds"));
        assert_eq!(
            cache
                .apply_transaction(id, TransactionId::new(1), "Bet", 40.0)
                .unwrap(),
            60.0
        );

        // D
        assert_eq!(
            cache
                .apply_transaction(id, TransactionId::new(2), "Win", 25.0)
                .unwrap(),
            85.0
        );
        let snapshot = cache.get_user(id).unwrap();
        assert_eq!(snapshot.balance, 85.0);
        assert_eq!(snapshot.win_count, 1);
        assert_eq!(snapshot.win_sum, 25.0);
        assert_eq!(snapshot.bet_count, 1);
        assert_eq!(snapshot.bet_sum, 40.0);
    }

    #[test]
    fn deposits_accumulate_into_balance() {
        let cache = cache_with_user(3);
        let id = UserId::new(3);
        let amounts = [10.0, 2.5, 7.25, 100.0];

        for (i, amount) in amounts.iter().enumerate() {
            cache
                .apply_deposit(id, DepositId::new(i as u64 + 1), *amount)
                .unwrap();
        }

        let snapshot = cache.get_user(id).unwrap();
        assert_eq!(snapshot.deposit_count, amounts.len() as u64);
        assert_eq!(snapshot.balance, amounts.iter().sum::<f64>());
        assert_eq!(snapshot.deposit_sum, snapshot.balance);
    }

    #[test]
    fn out_of_sequence_leaves_counters_unchanged() {
        let cache = cache_with_user(1);
        let id = UserId::new(1);
        cache.apply_deposit(id, DepositId::new(1), 10.0).unwrap();
        let before = cache.get_user(id).unwrap();

        assert!(cache.apply_deposit(id, DepositId::new(3), 10.0).is_err());
        assert!(cache
            .apply_transaction(id, TransactionId::new(2), "Win", 1.0)
            .is_err());
        assert!(cache
            .apply_transaction(id, TransactionId::new(0), "Bet", 1.0)
            .is_err());

        assert_eq!(cache.get_user(id).unwrap(), before);
    }

    #[test]
    fn concurrent_updates_on_one_user_are_not_lost() {
        let cache = Arc::new(cache_with_user(1));
        let id = UserId::new(1);
        let accepted = Arc::new(AtomicU64::new(0));

        thread::scope(|scope| {
            for _ in 0..8 {
                let cache = Arc::clone(&cache);
                let accepted = Arc::clone(&accepted);
                scope.spawn(move || {
                    for _ in 0..200 {
                        let next = cache.get_user(id).unwrap().win_count + 1;
                        if cache
                            .apply_transaction(id, TransactionId::new(next), "Win", 1.0)
                            .is_ok()
                        {
                            accepted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        let accepted = accepted.load(Ordering::Relaxed);
        let snapshot = cache.get_user(id).unwrap();
        assert!(accepted > 0);
        assert_eq!(snapshot.win_count, accepted);
        assert_eq!(snapshot.balance, accepted as f64);
    }

    #[test]
    fn other_users_proceed_while_one_is_locked() {
        let cache = Arc::new(LedgerCache::new());
        cache.create_user(UserId::new(1), 0.0).unwrap();
        cache.create_user(UserId::new(2), 0.0).unwrap();

        let record = cache.record(UserId::new(1)).unwrap();
        let _held = record.lock();

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&cache);
        thread::spawn(move || {
            let result = worker.apply_deposit(UserId::new(2), DepositId::new(1), 5.0);
            tx.send(result).unwrap();
        });

        let result = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(result.unwrap(), 5.0);
    }
}
