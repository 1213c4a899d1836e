//! Constants used throughout hotrank
//!
//! This module centralizes magic numbers and tuning values so the ranking,
//! session, and caching subsystems agree on a single source of truth.

use std::time::Duration;

/// Article ranking constants
pub mod ranking {
    /// Score contributed by a single upvote
    ///
    /// Also the bonus a fresh post starts with (the poster is its first
    /// voter), so a new article competes with slightly older ones.
    pub const VOTE_SCORE: f64 = 342.0;

    /// Score removed by a single downvote
    ///
    /// Intentionally larger in magnitude than [`VOTE_SCORE`]; a downvote
    /// costs more than an upvote earns. Product-confirmed asymmetry.
    pub const DOWNVOTE_PENALTY: f64 = 432.0;

    /// Voting window after which an article no longer accepts votes
    pub const VOTING_WINDOW_SECS: f64 = 7.0 * 86400.0;

    /// Articles returned per listing page
    pub const ARTICLES_PER_PAGE: usize = 25;

    /// TTL for cached per-group order intersections
    ///
    /// Recomputation is lazy and idempotent, so a short TTL trades a little
    /// staleness for bounded intersection work.
    pub const GROUP_ORDER_TTL_SECS: u64 = 60;
}

/// Session registry and sweeper constants
pub mod session {
    use super::Duration;

    /// Maximum number of sessions kept in the recency index
    pub const RECENT_CAPACITY: usize = 10_000_000;

    /// Upper bound on sessions evicted per sweep iteration
    ///
    /// Keeps each iteration short so cancellation is observed promptly.
    pub const SWEEP_BATCH_MAX: usize = 100;

    /// Sweeper sleep while the index is within capacity
    pub const SWEEP_IDLE: Duration = Duration::from_millis(1000);

    /// Most-recently-viewed items retained per session
    pub const VIEWED_PER_SESSION: usize = 25;
}

/// View popularity tracking constants
pub mod popularity {
    use super::Duration;

    /// Interval between decay passes over the global popularity index
    pub const DECAY_INTERVAL: Duration = Duration::from_secs(300);

    /// Number of best-ranked items kept by each decay pass
    pub const KEEP_RANKS: usize = 20_000;

    /// Multiplier applied to surviving scores on each decay pass
    ///
    /// Halving old scores gives recent views relatively more weight.
    pub const DECAY_FACTOR: f64 = 0.5;

    /// An item must rank within this many most-viewed items to be
    /// admitted into the page cache
    pub const CACHE_RANK_CUTOFF: usize = 10_000;
}

/// Delayed row re-cache scheduler constants
pub mod scheduler {
    use super::Duration;

    /// Driver sleep when no scheduled row is due
    pub const IDLE_POLL: Duration = Duration::from_millis(50);
}

/// Page cache constants
pub mod page_cache {
    /// TTL for cached page content
    pub const CONTENT_TTL_SECS: u64 = 300;
}

/// Backoff applied by background loops after a store error before the next
/// poll iteration, so a flapping store does not produce a hot error loop
pub const LOOP_ERROR_BACKOFF: Duration = Duration::from_millis(500);

#[cfg(test)]
#[allow(clippy::assertions_on_constants)]
mod tests {
    use super::*;

    #[test]
    fn test_downvote_costs_more_than_upvote_earns() {
        assert!(ranking::DOWNVOTE_PENALTY > ranking::VOTE_SCORE);
    }

    #[test]
    fn test_voting_window_is_one_week() {
        assert_eq!(ranking::VOTING_WINDOW_SECS, 604_800.0);
    }

    #[test]
    fn test_admission_cutoff_within_kept_ranks() {
        // Decay must not trim items the page cache still considers hot
        assert!(popularity::CACHE_RANK_CUTOFF <= popularity::KEEP_RANKS);
    }

    #[test]
    fn test_sweep_batch_bounded() {
        assert!(session::SWEEP_BATCH_MAX > 0);
        assert!(session::SWEEP_BATCH_MAX <= 1000);
    }

    #[test]
    fn test_scheduler_polls_faster_than_sweeper() {
        assert!(scheduler::IDLE_POLL < session::SWEEP_IDLE);
    }
}
