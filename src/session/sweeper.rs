//! Background eviction of the oldest sessions
//!
//! The recency index is allowed to grow to a fixed capacity; beyond that,
//! the sweeper deletes the oldest sessions in bounded batches. Dependent
//! state is scrubbed before the recency entry itself, so a partial failure
//! can leave orphaned garbage but never a reachable token whose state was
//! half-deleted elsewhere.

use crate::constants::session::{RECENT_CAPACITY, SWEEP_BATCH_MAX, SWEEP_IDLE};
use crate::constants::LOOP_ERROR_BACKOFF;
use crate::shutdown::Shutdown;
use crate::store::{OrderedStore, StoreResult};
use crate::types::{keys, SessionToken};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capacity-bounding session eviction loop
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    store: Arc<dyn OrderedStore>,
    capacity: usize,
    batch_max: usize,
}

impl SessionSweeper {
    #[must_use]
    pub fn new(store: Arc<dyn OrderedStore>) -> Self {
        Self {
            store,
            capacity: RECENT_CAPACITY,
            batch_max: SWEEP_BATCH_MAX,
        }
    }

    /// Override the session capacity (tests use small values)
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Override the per-iteration eviction bound
    #[must_use]
    pub fn with_batch_max(mut self, batch_max: usize) -> Self {
        self.batch_max = batch_max;
        self
    }

    /// One sweep iteration; returns how many sessions were evicted
    ///
    /// Zero means the index is within capacity and the caller should idle.
    pub async fn sweep_once(&self) -> StoreResult<usize> {
        let size = self.store.zcard(keys::RECENT).await?;
        if size <= self.capacity {
            return Ok(0);
        }

        let batch = (size - self.capacity).min(self.batch_max);
        if batch == 0 {
            // A zero batch bound must not turn the 0..-1 range into a
            // full-index fetch
            return Ok(0);
        }
        let oldest = self.store.zrange(keys::RECENT, 0, batch as i64 - 1).await?;

        let mut evicted = 0;
        for raw in oldest {
            let token = SessionToken::new(raw);
            self.evict(&token).await?;
            evicted += 1;
        }
        debug!(evicted, remaining = size - evicted, "swept sessions");
        Ok(evicted)
    }

    /// Delete everything belonging to one session
    ///
    /// Order matters: dependent keys first, the recency entry last, so the
    /// token stays visible to a retry until its state is fully scrubbed.
    async fn evict(&self, token: &SessionToken) -> StoreResult<()> {
        self.store.delete(&token.cart_key()).await?;
        self.store.delete(&token.viewed_key()).await?;
        self.store.hdel(keys::LOGIN, token.as_str()).await?;
        self.store.zrem(keys::RECENT, token.as_str()).await?;
        Ok(())
    }

    /// Polling loop; exits only on cancellation
    pub async fn run(&self, shutdown: Shutdown) {
        info!(capacity = self.capacity, "session sweeper started");
        while !shutdown.is_cancelled() {
            match self.sweep_once().await {
                // Within capacity: idle before checking again
                Ok(0) => shutdown.sleep(SWEEP_IDLE).await,
                // Over capacity: keep sweeping without sleeping
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "session sweep failed, will retry");
                    shutdown.sleep(LOOP_ERROR_BACKOFF).await;
                }
            }
        }
        info!("session sweeper stopped");
    }
}
