//! Write-back of dirty records to durable storage.
//!
//! A flush pass snapshots every dirty record (holding each record's lock only while
//! copying), writes all snapshots in one atomic batch, and then drops the flushed
//! entries from the records. If the write fails nothing is dropped and the next
//! pass retries with the same data plus whatever accumulated since.
//!
//! Records are snapshotted one after another, so a pass is consistent per user but
//! not across users. Passes themselves are serialized: a forced flush that arrives
//! while a tick is writing waits for it, so an older snapshot can never be committed
//! over a newer one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use wallet_store::{Store, StoreError, UpdateBatch};

use super::cache::LedgerCache;

/// What a flush pass wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// User aggregates written.
    pub users: usize,
    /// Deposit records written.
    pub deposits: usize,
    /// Transaction records written.
    pub transactions: usize,
}

impl FlushReport {
    /// Whether the pass wrote nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users == 0
    }
}

/// Run a flush pass regardless of the changed flag.
///
/// # Errors
///
/// Returns the store error if the batch could not be written. The cache is left
/// marked as changed so the next pass retries.
pub fn flush_now(cache: &LedgerCache, store: &dyn Store) -> Result<FlushReport, StoreError> {
    let _pass = cache.flush_guard();
    cache.take_changes();

    let pending: Vec<_> = cache
        .dirty_records()
        .into_iter()
        .filter_map(|record| record.pending_flush().map(|flush| (record, flush)))
        .collect();

    let mut report = FlushReport::default();
    let mut batch = UpdateBatch::new();
    for (_, flush) in &pending {
        batch.put_user(flush.user_id, flush.ledger);
        for (id, deposit) in &flush.deposits {
            batch.put_deposit(flush.user_id, *id, deposit.clone());
        }
        for (id, transaction) in &flush.transactions {
            batch.put_transaction(flush.user_id, *id, transaction.clone());
        }

        report.users += 1;
        report.deposits += flush.deposits.len();
        report.transactions += flush.transactions.len();
    }

    if batch.is_empty() {
        return Ok(report);
    }

    if let Err(e) = store.commit(&batch) {
        cache.mark_changed();
        return Err(e);
    }

    for (record, flush) in &pending {
        record.mark_flushed(flush);
    }

    Ok(report)
}

/// Run a flush pass only if something changed since the last one.
///
/// # Errors
///
/// See [`flush_now`].
pub fn flush_if_changed(
    cache: &LedgerCache,
    store: &dyn Store,
) -> Result<Option<FlushReport>, StoreError> {
    if !cache.has_changes() {
        return Ok(None);
    }
    flush_now(cache, store).map(Some)
}

/// Periodic flush task.
pub struct FlushScheduler {
    cache: Arc<LedgerCache>,
    store: Arc<dyn Store>,
    interval: Duration,
}

impl FlushScheduler {
    /// Create a scheduler that flushes `cache` into `store` every `interval`.
    #[must_use]
    pub fn new(cache: Arc<LedgerCache>, store: Arc<dyn Store>, interval: Duration) -> Self {
        Self {
            cache,
            store,
            interval,
        }
    }

    /// Start the scheduler on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> FlushHandle {
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(self.run(stopped));
        FlushHandle { stop, task }
    }

    async fn run(self, mut stopped: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        tracing::info!(interval = ?self.interval, "Flush scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                changed = stopped.changed() => {
                    if changed.is_err() || *stopped.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Flush scheduler stopped");
    }

    async fn tick(&self) {
        tracing::trace!("Flush tick");

        let cache = Arc::clone(&self.cache);
        let store = Arc::clone(&self.store);
        let result =
            tokio::task::spawn_blocking(move || flush_if_changed(&cache, store.as_ref())).await;

        match result {
            Ok(Ok(Some(report))) if !report.is_empty() => {
                tracing::info!(
                    users = report.users,
                    deposits = report.deposits,
                    transactions = report.transactions,
                    "Flushed ledger to storage"
                );
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Flush failed, will retry on next tick");
            }
            Err(e) => {
                tracing::error!(error = %e, "Flush task panicked");
                self.cache.mark_changed();
            }
        }
    }
}

/// Handle to a running [`FlushScheduler`].
pub struct FlushHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FlushHandle {
    /// Signal the scheduler to stop and wait for it.
    ///
    /// A pass already in progress completes first.
    ///
    /// # Errors
    ///
    /// Returns the join error if the scheduler task panicked.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        // The receiver only goes away if the task already ended
        let _ = self.stop.send(true);
        self.task.await
    }
}
