//! Delayed write-back refresh of cached inventory rows
//!
//! Two paired sorted mappings drive the scheduler: the delay index holds
//! each row's desired refresh interval, the schedule index its next due
//! timestamp. The schedule index *is* the priority queue: the driver peeks
//! the single earliest entry and either refreshes or retires it. State
//! survives in the store, so a restarted driver resumes where the last one
//! stopped.

use crate::clock::Clock;
use crate::constants::scheduler::IDLE_POLL;
use crate::constants::LOOP_ERROR_BACKOFF;
use crate::shutdown::Shutdown;
use crate::store::{OrderedStore, StoreError};
use crate::types::{keys, RowId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// External inventory row lookup
///
/// Consulted only when a scheduled row comes due; never on the read path.
#[async_trait]
pub trait Inventory: Send + Sync + std::fmt::Debug {
    /// Fetch the current snapshot of a row
    async fn fetch_row(&self, row: RowId) -> anyhow::Result<serde_json::Value>;
}

/// Scheduler operation failure
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("inventory fetch for row {row} failed")]
    Inventory {
        row: RowId,
        #[source]
        source: anyhow::Error,
    },

    #[error("row {row} snapshot could not be serialized")]
    Serialize {
        row: RowId,
        #[source]
        source: serde_json::Error,
    },
}

/// What one driver iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerTick {
    /// Nothing due; the driver should idle briefly
    Idle,
    /// Row retired: delay, schedule, and cached snapshot all removed
    Removed(RowId),
    /// Row refreshed from inventory and rescheduled
    Refreshed(RowId),
}

/// Priority-ordered re-cache scheduler
#[derive(Debug, Clone)]
pub struct DelayedRowScheduler {
    store: Arc<dyn OrderedStore>,
    clock: Arc<dyn Clock>,
    inventory: Arc<dyn Inventory>,
}

impl DelayedRowScheduler {
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderedStore>,
        clock: Arc<dyn Clock>,
        inventory: Arc<dyn Inventory>,
    ) -> Self {
        Self {
            store,
            clock,
            inventory,
        }
    }

    /// Register a row for refresh every `delay_secs` seconds
    ///
    /// The row is due immediately, so the first refresh happens on the
    /// next driver iteration. A non-positive delay marks the row for
    /// removal instead: the driver will retire it and drop its cached
    /// snapshot.
    pub async fn schedule(&self, row: RowId, delay_secs: f64) -> Result<(), SchedulerError> {
        let member = row.member();
        self.store.zadd(keys::DELAY, &member, delay_secs).await?;
        self.store
            .zadd(keys::SCHEDULE, &member, self.clock.now_secs())
            .await?;
        debug!(row = %row, delay_secs, "row scheduled");
        Ok(())
    }

    /// One driver iteration: peek the earliest due entry and process it
    pub async fn run_once(&self) -> Result<SchedulerTick, SchedulerError> {
        // Peek, not pop: the entry stays in the schedule until this
        // iteration decides its fate
        let next = self.store.zrange_with_scores(keys::SCHEDULE, 0, 0).await?;
        let now = self.clock.now_secs();

        let Some((member, due)) = next.into_iter().next() else {
            return Ok(SchedulerTick::Idle);
        };
        if due > now {
            return Ok(SchedulerTick::Idle);
        }

        let Some(row) = RowId::from_member(&member) else {
            // A member that doesn't parse can never be processed; drop it
            // rather than spin on it forever
            warn!(member, "unparseable schedule entry dropped");
            self.store.zrem(keys::SCHEDULE, &member).await?;
            self.store.zrem(keys::DELAY, &member).await?;
            return Ok(SchedulerTick::Idle);
        };

        let delay = self
            .store
            .zscore(keys::DELAY, &member)
            .await?
            .unwrap_or(0.0);

        if delay <= 0.0 {
            self.store.zrem(keys::DELAY, &member).await?;
            self.store.zrem(keys::SCHEDULE, &member).await?;
            self.store.delete(&row.cache_key()).await?;
            debug!(row = %row, "row retired from re-cache schedule");
            return Ok(SchedulerTick::Removed(row));
        }

        let snapshot = self
            .inventory
            .fetch_row(row)
            .await
            .map_err(|source| SchedulerError::Inventory { row, source })?;
        let serialized = serde_json::to_string(&snapshot)
            .map_err(|source| SchedulerError::Serialize { row, source })?;

        self.store
            .zadd(keys::SCHEDULE, &member, now + delay)
            .await?;
        self.store.set(&row.cache_key(), &serialized).await?;
        debug!(row = %row, next_due = now + delay, "row refreshed");
        Ok(SchedulerTick::Refreshed(row))
    }

    /// Driver loop; exits only on cancellation
    ///
    /// A failed iteration (inventory down, store hiccup) is logged and
    /// retried after a bounded backoff rather than killing the loop.
    pub async fn run(&self, shutdown: Shutdown) {
        info!("row re-cache driver started");
        while !shutdown.is_cancelled() {
            match self.run_once().await {
                Ok(SchedulerTick::Idle) => shutdown.sleep(IDLE_POLL).await,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "scheduler iteration failed, will retry");
                    shutdown.sleep(LOOP_ERROR_BACKOFF).await;
                }
            }
        }
        info!("row re-cache driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Inventory stub serving canned rows and counting fetches
    #[derive(Debug, Default)]
    struct StubInventory {
        rows: Mutex<HashMap<u64, serde_json::Value>>,
        fetches: AtomicUsize,
    }

    impl StubInventory {
        fn insert(&self, row: RowId, value: serde_json::Value) {
            self.rows.lock().unwrap().insert(row.get(), value);
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Inventory for StubInventory {
        async fn fetch_row(&self, row: RowId) -> anyhow::Result<serde_json::Value> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.rows
                .lock()
                .unwrap()
                .get(&row.get())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("row {row} not found"))
        }
    }

    struct Fixture {
        scheduler: DelayedRowScheduler,
        store: Arc<MemoryStore>,
        clock: ManualClock,
        inventory: Arc<StubInventory>,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::starting_at(10_000.0);
        let store = Arc::new(MemoryStore::new(Arc::new(clock.clone())));
        let inventory = Arc::new(StubInventory::default());
        let scheduler = DelayedRowScheduler::new(
            store.clone(),
            Arc::new(clock.clone()),
            inventory.clone(),
        );
        Fixture {
            scheduler,
            store,
            clock,
            inventory,
        }
    }

    #[tokio::test]
    async fn test_idle_when_nothing_scheduled() {
        let f = fixture();
        assert_eq!(f.scheduler.run_once().await.unwrap(), SchedulerTick::Idle);
    }

    #[tokio::test]
    async fn test_schedule_is_due_immediately() {
        let f = fixture();
        let row = RowId::new(1);
        f.inventory.insert(row, json!({"sku": "widget", "qty": 4}));
        f.scheduler.schedule(row, 5.0).await.unwrap();

        // No clock advance needed: (re)schedule makes the row due now
        assert_eq!(
            f.scheduler.run_once().await.unwrap(),
            SchedulerTick::Refreshed(row)
        );
        let cached = f.store.get(&row.cache_key()).await.unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&cached).unwrap();
        assert_eq!(parsed, json!({"sku": "widget", "qty": 4}));
    }

    #[tokio::test]
    async fn test_refresh_reschedules_at_now_plus_delay() {
        let f = fixture();
        let row = RowId::new(1);
        f.inventory.insert(row, json!({"qty": 1}));
        f.scheduler.schedule(row, 5.0).await.unwrap();

        let before = f.clock.now_secs();
        f.scheduler.run_once().await.unwrap();
        assert_eq!(
            f.store.zscore(keys::SCHEDULE, "1").await.unwrap(),
            Some(before + 5.0)
        );

        // Not due again until the delay elapses
        assert_eq!(f.scheduler.run_once().await.unwrap(), SchedulerTick::Idle);
        assert_eq!(f.inventory.fetch_count(), 1);

        f.clock.advance(5.0);
        assert_eq!(
            f.scheduler.run_once().await.unwrap(),
            SchedulerTick::Refreshed(row)
        );
        assert_eq!(f.inventory.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_delay_removes_everything() {
        let f = fixture();
        let row = RowId::new(7);
        f.inventory.insert(row, json!({"qty": 1}));

        // Populate the cache first, then ask for removal
        f.scheduler.schedule(row, 5.0).await.unwrap();
        f.scheduler.run_once().await.unwrap();
        assert!(f.store.exists(&row.cache_key()).await.unwrap());

        f.scheduler.schedule(row, 0.0).await.unwrap();
        assert_eq!(
            f.scheduler.run_once().await.unwrap(),
            SchedulerTick::Removed(row)
        );
        assert_eq!(f.store.zscore(keys::DELAY, "7").await.unwrap(), None);
        assert_eq!(f.store.zscore(keys::SCHEDULE, "7").await.unwrap(), None);
        assert!(!f.store.exists(&row.cache_key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_negative_delay_also_removes() {
        let f = fixture();
        let row = RowId::new(2);
        f.scheduler.schedule(row, -1.0).await.unwrap();
        assert_eq!(
            f.scheduler.run_once().await.unwrap(),
            SchedulerTick::Removed(row)
        );
    }

    #[tokio::test]
    async fn test_earliest_due_row_processed_first() {
        let f = fixture();
        let first = RowId::new(1);
        let second = RowId::new(2);
        f.inventory.insert(first, json!(1));
        f.inventory.insert(second, json!(2));

        f.scheduler.schedule(first, 10.0).await.unwrap();
        f.clock.advance(1.0);
        f.scheduler.schedule(second, 10.0).await.unwrap();

        // First was scheduled earlier, so it is due first
        assert_eq!(
            f.scheduler.run_once().await.unwrap(),
            SchedulerTick::Refreshed(first)
        );
        assert_eq!(
            f.scheduler.run_once().await.unwrap(),
            SchedulerTick::Refreshed(second)
        );
    }

    #[tokio::test]
    async fn test_inventory_failure_surfaces_and_row_stays_due() {
        let f = fixture();
        let row = RowId::new(9);
        // No stub row inserted: fetch fails
        f.scheduler.schedule(row, 5.0).await.unwrap();

        assert!(matches!(
            f.scheduler.run_once().await,
            Err(SchedulerError::Inventory { .. })
        ));
        // The schedule entry was not consumed; a later iteration retries
        f.inventory.insert(row, json!({"qty": 3}));
        assert_eq!(
            f.scheduler.run_once().await.unwrap(),
            SchedulerTick::Refreshed(row)
        );
    }

    #[tokio::test]
    async fn test_run_processes_due_rows_until_cancelled() {
        let f = fixture();
        let row = RowId::new(1);
        f.inventory.insert(row, json!({"qty": 1}));
        f.scheduler.schedule(row, 3600.0).await.unwrap();

        let shutdown = Shutdown::new();
        let task = {
            let scheduler = f.scheduler.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { scheduler.run(shutdown).await })
        };

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while !f.store.exists(&row.cache_key()).await.unwrap() {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("driver should refresh the due row");

        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("loop should exit on cancellation")
            .unwrap();
    }
}
