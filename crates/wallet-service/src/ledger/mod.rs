//! The wallet ledger: in-memory records, write-back and recovery.
//!
//! [`Ledger`] is the composition root. It recovers the cache from a [`Store`],
//! runs the periodic [`FlushScheduler`] and on [`Ledger::stop`] performs the final
//! flush before closing the store. Request handlers only ever see the shared
//! [`LedgerCache`].

pub mod cache;
pub mod flush;
pub mod record;
pub mod recovery;

pub use cache::LedgerCache;
pub use flush::{flush_if_changed, flush_now, FlushHandle, FlushReport, FlushScheduler};
pub use record::LedgerRecord;
pub use recovery::recover;

use std::sync::Arc;
use std::time::Duration;

use wallet_store::Store;

use crate::error::ServiceError;

/// Lifecycle options for a [`Ledger`].
#[derive(Debug, Clone, Copy)]
pub struct LedgerOptions {
    /// Period of the background flush.
    pub flush_interval: Duration,
    /// Whether [`Ledger::stop`] runs one last flush before closing the store.
    pub flush_on_shutdown: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(10),
            flush_on_shutdown: true,
        }
    }
}

/// A running ledger bound to its durable store.
pub struct Ledger {
    cache: Arc<LedgerCache>,
    store: Arc<dyn Store>,
    flusher: FlushHandle,
    flush_on_shutdown: bool,
}

impl Ledger {
    /// Recover the cache from `store` and start the background flush.
    ///
    /// # Errors
    ///
    /// Returns an error if recovery fails. The ledger must not serve requests
    /// in that case.
    pub async fn start(store: Arc<dyn Store>, options: LedgerOptions) -> Result<Self, ServiceError> {
        let source = Arc::clone(&store);
        let cache = tokio::task::spawn_blocking(move || recover(source.as_ref())).await??;
        let cache = Arc::new(cache);

        let flusher =
            FlushScheduler::new(Arc::clone(&cache), Arc::clone(&store), options.flush_interval)
                .spawn();

        Ok(Self {
            cache,
            store,
            flusher,
            flush_on_shutdown: options.flush_on_shutdown,
        })
    }

    /// The shared cache served to callers.
    #[must_use]
    pub fn cache(&self) -> Arc<LedgerCache> {
        Arc::clone(&self.cache)
    }

    /// The durable store behind the cache.
    #[must_use]
    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    /// Flush every dirty record now, whether or not the changed flag is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; the data stays pending.
    pub async fn flush(&self) -> Result<FlushReport, ServiceError> {
        let cache = Arc::clone(&self.cache);
        let store = Arc::clone(&self.store);
        let report = tokio::task::spawn_blocking(move || flush_now(&cache, store.as_ref())).await??;
        Ok(report)
    }

    /// Stop the flush task, run the final flush if enabled and close the store.
    ///
    /// Every step runs even if an earlier one failed, so the store is always
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns the first failure among the scheduler, the final flush and the
    /// close.
    pub async fn stop(self) -> Result<(), ServiceError> {
        let Self {
            cache,
            store,
            flusher,
            flush_on_shutdown,
        } = self;

        let stopped = flusher.shutdown().await.map_err(|e| {
            tracing::error!(error = %e, "Flush scheduler ended abnormally");
            ServiceError::from(e)
        });

        let flushed = if flush_on_shutdown {
            final_flush(cache, Arc::clone(&store)).await
        } else {
            tracing::warn!("Final flush disabled, changes since the last tick are not persisted");
            Ok(())
        };

        let closed = match tokio::task::spawn_blocking(move || store.close()).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(e) => Err(ServiceError::from(e)),
        };
        if let Err(e) = &closed {
            tracing::error!(error = %e, "Failed to close store");
        } else {
            tracing::info!("Ledger stopped");
        }

        stopped.and(flushed).and(closed)
    }
}

async fn final_flush(cache: Arc<LedgerCache>, store: Arc<dyn Store>) -> Result<(), ServiceError> {
    let result = tokio::task::spawn_blocking(move || flush_now(&cache, store.as_ref())).await;

    match result {
        Ok(Ok(report)) => {
            tracing::info!(
                users = report.users,
                deposits = report.deposits,
                transactions = report.transactions,
                "Final flush complete"
            );
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Final flush failed, unflushed changes are lost");
            Err(e.into())
        }
        Err(e) => {
            tracing::error!(error = %e, "Final flush task panicked");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wallet_core::{DepositId, TransactionId, UserId};
    use wallet_store::{MemoryStore, RocksStore, StoreError};

    fn idle() -> LedgerOptions {
        LedgerOptions {
            flush_interval: Duration::from_secs(3600),
            flush_on_shutdown: true,
        }
    }

    fn open(dir: &TempDir) -> Arc<dyn Store> {
        Arc::new(RocksStore::open(dir.path()).unwrap())
    }

    fn run_scenarios_a_to_d(cache: &LedgerCache) {
        let id = UserId::new(1);
        cache.create_user(id, 0.0).unwrap();
        cache.apply_deposit(id, DepositId::new(1), 100.0).unwrap();
        assert!(cache.apply_deposit(id, DepositId::new(1), 50.0).is_err());
        assert!(cache
            .apply_transaction(id, TransactionId::new(1), "Bet", 100.0)
            .is_err());
        cache
            .apply_transaction(id, TransactionId::new(1), "Bet", 40.0)
            .unwrap();
        assert_eq!(
            cache
                .apply_transaction(id, TransactionId::new(2), "Win", 25.0)
                .unwrap(),
            85.0
        );
    }

    #[tokio::test]
    async fn scenario_flush_does_not_alter_reads() {
        let ledger = Ledger::start(Arc::new(MemoryStore::new()), idle())
            .await
            .unwrap();
        let cache = ledger.cache();
        run_scenarios_a_to_d(&cache);

        let before = cache.get_user(UserId::new(1)).unwrap();
        let report = ledger.flush().await.unwrap();
        let after = cache.get_user(UserId::new(1)).unwrap();

        assert_eq!(report.users, 1);
        assert_eq!(before, after);
        ledger.stop().await.unwrap();
    }

    #[tokio::test]
    async fn scenario_kill_without_tick_recovers_last_flushed_value() {
        let dir = TempDir::new().unwrap();

        let ledger = Ledger::start(
            open(&dir),
            LedgerOptions {
                flush_on_shutdown: false,
                ..idle()
            },
        )
        .await
        .unwrap();
        let cache = ledger.cache();
        let id = UserId::new(1);
        cache.create_user(id, 0.0).unwrap();
        cache.apply_deposit(id, DepositId::new(1), 100.0).unwrap();
        ledger.flush().await.unwrap();

        cache
            .apply_transaction(id, TransactionId::new(1), "Bet", 40.0)
            .unwrap();
        cache
            .apply_transaction(id, TransactionId::new(2), "Win", 25.0)
            .unwrap();
        assert_eq!(cache.get_user(id).unwrap().balance, 85.0);
        ledger.stop().await.unwrap();

        let ledger = Ledger::start(open(&dir), idle()).await.unwrap();
        let recovered = ledger.cache().get_user(id).unwrap();
        assert_eq!(recovered.balance, 100.0);
        assert_eq!(recovered.bet_count, 0);
        assert_eq!(recovered.win_count, 0);
        ledger.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_flushes_and_restart_reproduces_counters() {
        let dir = TempDir::new().unwrap();

        let ledger = Ledger::start(open(&dir), idle()).await.unwrap();
        run_scenarios_a_to_d(&ledger.cache());
        let expected = ledger.cache().get_user(UserId::new(1)).unwrap();
        ledger.stop().await.unwrap();

        let ledger = Ledger::start(open(&dir), idle()).await.unwrap();
        assert_eq!(ledger.cache().get_user(UserId::new(1)).unwrap(), expected);
        assert_eq!(ledger.store().transactions(UserId::new(1)).unwrap().len(), 2);
        assert_eq!(ledger.store().deposits(UserId::new(1)).unwrap().len(), 1);
        ledger.stop().await.unwrap();
    }

    #[tokio::test]
    async fn sequences_continue_after_restart() {
        let dir = TempDir::new().unwrap();

        let ledger = Ledger::start(open(&dir), idle()).await.unwrap();
        run_scenarios_a_to_d(&ledger.cache());
        ledger.stop().await.unwrap();

        let ledger = Ledger::start(open(&dir), idle()).await.unwrap();
        let cache = ledger.cache();
        let id = UserId::new(1);

        assert!(cache
            .apply_transaction(id, TransactionId::new(2), "Win", 1.0)
            .unwrap_err()
            .has("out_of_sequence"));
        assert_eq!(
            cache
                .apply_transaction(id, TransactionId::new(3), "Win", 15.0)
                .unwrap(),
            100.0
        );
        assert_eq!(cache.apply_deposit(id, DepositId::new(2), 1.0).unwrap(), 101.0);
        ledger.stop().await.unwrap();

        let ledger = Ledger::start(open(&dir), idle()).await.unwrap();
        let store = ledger.store();
        let transactions = store.transactions(id).unwrap();
        let ids: Vec<u64> = transactions.iter().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        ledger.stop().await.unwrap();
    }

    #[tokio::test]
    async fn failed_final_flush_is_reported_and_store_still_closed() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::start(Arc::clone(&store) as Arc<dyn Store>, idle())
            .await
            .unwrap();
        ledger.cache().create_user(UserId::new(1), 0.0).unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            ledger.stop().await,
            Err(ServiceError::Store(StoreError::InjectedFailure))
        ));
        assert!(matches!(store.users(), Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn stop_writes_pending_changes_then_closes() {
        let store = Arc::new(MemoryStore::new());
        let ledger = Ledger::start(Arc::clone(&store) as Arc<dyn Store>, idle())
            .await
            .unwrap();
        run_scenarios_a_to_d(&ledger.cache());

        ledger.stop().await.unwrap();

        assert_eq!(store.commit_count(), 1);
        assert!(matches!(store.user(UserId::new(1)), Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn start_fails_on_unreadable_store() {
        let store = MemoryStore::new();
        store.close().unwrap();
        assert!(Ledger::start(Arc::new(store), idle()).await.is_err());
    }
}
