//! Startup recovery of the ledger cache.

use wallet_store::{Store, StoreError};

use super::cache::LedgerCache;

/// Rebuild the cache from every persisted user aggregate.
///
/// Recovered records start clean with no pending detail. Previously flushed
/// deposits and transactions stay in storage and are not loaded.
///
/// # Errors
///
/// Returns the store error if iteration or decoding fails. Callers treat this as
/// fatal: serving a partial set of users would let ids that exist on disk be
/// created again.
pub fn recover(store: &dyn Store) -> Result<LedgerCache, StoreError> {
    let cache = LedgerCache::new();

    for (user_id, ledger) in store.users()? {
        cache.insert_recovered(user_id, ledger);
    }

    tracing::info!(users = cache.len(), "Recovered ledger from storage");
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallet_core::{DepositId, UserId, UserLedger};
    use wallet_store::{MemoryStore, UpdateBatch};

    #[test]
    fn recovered_records_are_clean_and_continue_sequences() {
        let store = MemoryStore::new();
        let ledger = UserLedger {
            balance: 30.0,
            deposit_count: 2,
            deposit_sum: 30.0,
            ..UserLedger::default()
        };
        let mut batch = UpdateBatch::new();
        batch.put_user(UserId::new(5), ledger);
        store.commit(&batch).unwrap();

        let cache = recover(&store).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(!cache.has_changes());
        assert!(cache.dirty_records().is_empty());
        assert_eq!(cache.get_user(UserId::new(5)).unwrap(), ledger.snapshot(UserId::new(5)));

        assert!(cache
            .apply_deposit(UserId::new(5), DepositId::new(2), 1.0)
            .unwrap_err()
            .has("out_of_sequence"));
        assert_eq!(
            cache
                .apply_deposit(UserId::new(5), DepositId::new(3), 1.0)
                .unwrap(),
            31.0
        );
    }

    #[test]
    fn recovered_ids_cannot_be_created_again() {
        let store = MemoryStore::new();
        let mut batch = UpdateBatch::new();
        batch.put_user(UserId::new(1), UserLedger::new(0.0));
        store.commit(&batch).unwrap();

        let cache = recover(&store).unwrap();
        assert!(cache.create_user(UserId::new(1), 0.0).is_err());
    }

    #[test]
    fn unreadable_store_fails_recovery() {
        let store = MemoryStore::new();
        store.close().unwrap();
        assert!(matches!(recover(&store), Err(StoreError::Closed)));
    }
}
