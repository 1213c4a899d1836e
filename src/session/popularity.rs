//! Decaying popularity ranking of viewed items
//!
//! The global popularity index scores items by negated view count, so the
//! most-viewed item has the lowest score and rank 0. A periodic decay pass
//! trims the index to its best 20,000 entries and halves the surviving
//! scores, which keeps the index bounded and weights recent views more
//! heavily than old ones.

use crate::constants::popularity::{CACHE_RANK_CUTOFF, DECAY_FACTOR, DECAY_INTERVAL, KEEP_RANKS};
use crate::constants::LOOP_ERROR_BACKOFF;
use crate::shutdown::Shutdown;
use crate::store::{Aggregate, OrderedStore, StoreResult};
use crate::types::{keys, ItemId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Global item popularity index and its decay task
#[derive(Debug, Clone)]
pub struct ViewPopularityTracker {
    store: Arc<dyn OrderedStore>,
    decay_interval: std::time::Duration,
}

impl ViewPopularityTracker {
    #[must_use]
    pub fn new(store: Arc<dyn OrderedStore>) -> Self {
        Self {
            store,
            decay_interval: DECAY_INTERVAL,
        }
    }

    /// Override the decay interval
    #[must_use]
    pub fn with_decay_interval(mut self, interval: std::time::Duration) -> Self {
        self.decay_interval = interval;
        self
    }

    /// Count one view of `item` (scores go down, popularity goes up)
    pub async fn record_view(&self, item: &ItemId) -> StoreResult<()> {
        self.store
            .zincrby(keys::POPULARITY, item.as_str(), -1.0)
            .await?;
        Ok(())
    }

    /// Whether `item` is popular enough for its pages to be cached
    ///
    /// True iff the item has a rank and it falls within the top 10,000.
    pub async fn is_cache_eligible(&self, item: &ItemId) -> StoreResult<bool> {
        Ok(self
            .store
            .zrank(keys::POPULARITY, item.as_str())
            .await?
            .is_some_and(|rank| rank < CACHE_RANK_CUTOFF))
    }

    /// One decay pass: trim to the best 20,000 ranks, then halve scores
    pub async fn decay_once(&self) -> StoreResult<()> {
        let trimmed = self
            .store
            .zremrangebyrank(keys::POPULARITY, KEEP_RANKS as i64, -1)
            .await?;
        self.store
            .zinterstore(
                keys::POPULARITY,
                &[(keys::POPULARITY, DECAY_FACTOR)],
                Aggregate::Sum,
            )
            .await?;
        debug!(trimmed, "decayed popularity index");
        Ok(())
    }

    /// Periodic decay loop; exits only on cancellation
    pub async fn run(&self, shutdown: Shutdown) {
        while !shutdown.is_cancelled() {
            if let Err(e) = self.decay_once().await {
                warn!(error = %e, "popularity decay failed, will retry");
                shutdown.sleep(LOOP_ERROR_BACKOFF).await;
                continue;
            }
            shutdown.sleep(self.decay_interval).await;
        }
        debug!("popularity decay loop stopped");
    }
}
