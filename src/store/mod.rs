//! Ordered key-value store capability trait
//!
//! The ranking and caching subsystems never talk to a concrete backend;
//! they hold an `Arc<dyn OrderedStore>` carrying exactly the command
//! surface they need. Each command is individually atomic. Multi-command
//! sequences are *not* transactional; callers that need stronger guarantees
//! must arrange them from single-command results (see the vote ledger).

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Store command failure
///
/// Absent keys are *not* errors; they surface as `None`/`false`/empty
/// results on the individual commands.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key exists but holds a value of a different kind
    #[error("key '{key}' holds a value of the wrong kind (expected {expected})")]
    WrongKind {
        key: String,
        expected: &'static str,
    },

    /// The value could not be interpreted as required by the command
    #[error("key '{key}': {reason}")]
    BadValue { key: String, reason: String },

    /// The backend could not be reached; fatal to the calling operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregation applied when a member appears in several inputs of
/// [`OrderedStore::zinterstore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Max,
    Min,
}

/// Ordered key-value store command surface
///
/// Semantics follow the usual sorted-set conventions: ranks are ascending
/// by `(score, member)`, range bounds are inclusive, and negative range
/// indices count from the end (`-1` is the last element).
///
/// Plain sets participate in [`zinterstore`](Self::zinterstore) with an
/// implicit member score of `1.0`.
#[async_trait]
pub trait OrderedStore: Send + Sync + std::fmt::Debug {
    // Strings

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;
    /// Remove a key of any kind; absent keys are a no-op
    async fn delete(&self, key: &str) -> StoreResult<()>;
    /// Increment an integer-valued string key, creating it at 0 first
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    // Keys

    async fn exists(&self, key: &str) -> StoreResult<bool>;
    /// Set a time-to-live on an existing key; returns false if absent
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;

    // Hashes

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;
    async fn hset_multi(&self, key: &str, entries: &[(&str, String)]) -> StoreResult<()>;
    /// Remove a hash field; returns whether it was present
    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool>;
    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>>;
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    // Sets

    /// Add a member; returns whether membership changed (the duplicate-vote
    /// guard relies on this being atomic)
    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool>;
    /// Remove a member; returns whether it was present
    async fn srem(&self, key: &str, member: &str) -> StoreResult<bool>;

    // Sorted sets

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()>;
    /// Adjust a member's score, creating it at 0 first; returns new score
    async fn zincrby(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64>;
    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>>;
    /// Ascending rank of a member (0 = lowest score)
    async fn zrank(&self, key: &str, member: &str) -> StoreResult<Option<usize>>;
    async fn zcard(&self, key: &str) -> StoreResult<usize>;
    /// Members in ascending score order, inclusive rank bounds
    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;
    /// Like [`zrange`](Self::zrange) but paired with scores
    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, f64)>>;
    /// Members in descending score order, inclusive rank bounds
    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;
    /// Remove a member; returns whether it was present
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool>;
    /// Remove members by ascending rank range; returns how many were removed
    async fn zremrangebyrank(&self, key: &str, start: i64, stop: i64) -> StoreResult<usize>;
    /// Store at `dest` the weighted intersection of `sources`
    ///
    /// `sources` pairs each input key with a weight applied to its scores
    /// before aggregation. Overwrites `dest` (clearing any TTL) and returns
    /// the resulting cardinality. `dest` may itself be a source, which is
    /// how the popularity index decays in place.
    async fn zinterstore(
        &self,
        dest: &str,
        sources: &[(&str, f64)],
        aggregate: Aggregate,
    ) -> StoreResult<usize>;
}
