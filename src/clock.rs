//! Clock seam for cutoffs, recency, and scheduling
//!
//! All timestamps in the store are fractional seconds since the Unix epoch.
//! Production code uses [`SystemClock`]; tests inject a [`ManualClock`] so
//! voting windows and schedule due times can be exercised without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" timestamps
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time as fractional seconds since the Unix epoch
    fn now_secs(&self) -> f64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64())
    }
}

/// Manually advanced clock for tests
///
/// Stored as microseconds in an atomic so clones share one timeline.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start the clock at the given timestamp (seconds)
    #[must_use]
    pub fn starting_at(secs: f64) -> Self {
        let clock = Self::default();
        clock.set(secs);
        clock
    }

    /// Jump to an absolute timestamp (seconds)
    pub fn set(&self, secs: f64) {
        self.micros
            .store((secs * 1_000_000.0) as u64, Ordering::SeqCst);
    }

    /// Advance by a relative amount (seconds)
    pub fn advance(&self, secs: f64) {
        self.micros
            .fetch_add((secs * 1_000_000.0) as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}
