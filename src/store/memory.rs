//! In-memory reference implementation of [`OrderedStore`]
//!
//! One mutex guards the whole keyspace and is never held across an await,
//! which gives every command the per-command atomicity the trait contract
//! requires. Expiry is lazy: a key past its deadline is dropped the next
//! time any command touches it.
//!
//! This backs tests and the standalone daemon; a networked backend would
//! implement the same trait.

use super::{Aggregate, OrderedStore, StoreError, StoreResult};
use crate::clock::Clock;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
    Zset(HashMap<String, f64>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// Absolute deadline in clock seconds; `None` means no expiry
    expires_at: Option<f64>,
}

impl Entry {
    fn live(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }
}

/// In-memory [`OrderedStore`]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned map means a panic mid-command; the data may be torn,
        // so surfacing the panic is the right call
        self.inner.lock().expect("store mutex poisoned")
    }

    fn wrong_kind(key: &str, expected: &'static str) -> StoreError {
        StoreError::WrongKind {
            key: key.to_string(),
            expected,
        }
    }
}

/// Drop `key` if its entry has expired, then return whether it is live
fn purge_expired(map: &mut HashMap<String, Entry>, key: &str, now: f64) -> bool {
    if let Some(entry) = map.get(key) {
        if entry.expires_at.is_some_and(|deadline| deadline <= now) {
            map.remove(key);
            return false;
        }
        return true;
    }
    false
}

/// Resolve inclusive, possibly-negative rank bounds against `len`
///
/// Returns `None` when the resolved range is empty.
fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    start = start.max(0);
    stop = stop.min(len - 1);
    if len == 0 || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Members of a zset ordered ascending by `(score, member)`
fn sorted_members(zset: &HashMap<String, f64>) -> Vec<(String, f64)> {
    let mut members: Vec<(String, f64)> = zset
        .iter()
        .map(|(member, score)| (member.clone(), *score))
        .collect();
    members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    members
}

macro_rules! typed_entry {
    // Borrow the value of `key` as the given kind, inserting an empty one
    // if absent. Errors on kind mismatch.
    ($map:expr, $key:expr, $variant:ident, $empty:expr, $expected:literal) => {{
        let entry = $map
            .entry($key.to_string())
            .or_insert_with(|| Entry::live(Value::$variant($empty)));
        match &mut entry.value {
            Value::$variant(inner) => Ok(inner),
            _ => Err(MemoryStore::wrong_kind($key, $expected)),
        }
    }};
}

#[async_trait]
impl OrderedStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(None);
        }
        match &map.get(key).expect("checked live").value {
            Value::Str(s) => Ok(Some(s.clone())),
            _ => Err(Self::wrong_kind(key, "string")),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self.lock();
        map.insert(key.to_string(), Entry::live(Value::Str(value.to_string())));
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let deadline = self.clock.now_secs() + ttl.as_secs_f64();
        let mut map = self.lock();
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(deadline),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        purge_expired(&mut map, key, now);
        let current = typed_entry!(map, key, Str, "0".to_string(), "string")?;
        let parsed: i64 = current.parse().map_err(|_| StoreError::BadValue {
            key: key.to_string(),
            reason: "value is not an integer".to_string(),
        })?;
        let next = parsed + 1;
        *current = next.to_string();
        Ok(next)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        Ok(purge_expired(&mut map, key, now))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(false);
        }
        let entry = map.get_mut(key).expect("checked live");
        entry.expires_at = Some(now + ttl.as_secs_f64());
        Ok(true)
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(None);
        }
        match &map.get(key).expect("checked live").value {
            Value::Hash(h) => Ok(h.get(field).cloned()),
            _ => Err(Self::wrong_kind(key, "hash")),
        }
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        purge_expired(&mut map, key, now);
        let hash = typed_entry!(map, key, Hash, HashMap::new(), "hash")?;
        hash.insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hset_multi(&self, key: &str, entries: &[(&str, String)]) -> StoreResult<()> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        purge_expired(&mut map, key, now);
        let hash = typed_entry!(map, key, Hash, HashMap::new(), "hash")?;
        for (field, value) in entries {
            hash.insert((*field).to_string(), value.clone());
        }
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(false);
        }
        match &mut map.get_mut(key).expect("checked live").value {
            Value::Hash(h) => {
                let removed = h.remove(field).is_some();
                if h.is_empty() {
                    map.remove(key);
                }
                Ok(removed)
            }
            _ => Err(Self::wrong_kind(key, "hash")),
        }
    }

    async fn hgetall(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(HashMap::new());
        }
        match &map.get(key).expect("checked live").value {
            Value::Hash(h) => Ok(h.clone()),
            _ => Err(Self::wrong_kind(key, "hash")),
        }
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        purge_expired(&mut map, key, now);
        let hash = typed_entry!(map, key, Hash, HashMap::new(), "hash")?;
        let current: i64 = match hash.get(field) {
            Some(value) => value.parse().map_err(|_| StoreError::BadValue {
                key: key.to_string(),
                reason: format!("field '{field}' is not an integer"),
            })?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        purge_expired(&mut map, key, now);
        let set = typed_entry!(map, key, Set, HashSet::new(), "set")?;
        Ok(set.insert(member.to_string()))
    }

    async fn srem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(false);
        }
        match &mut map.get_mut(key).expect("checked live").value {
            Value::Set(s) => {
                let removed = s.remove(member);
                if s.is_empty() {
                    map.remove(key);
                }
                Ok(removed)
            }
            _ => Err(Self::wrong_kind(key, "set")),
        }
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        purge_expired(&mut map, key, now);
        let zset = typed_entry!(map, key, Zset, HashMap::new(), "sorted set")?;
        zset.insert(member.to_string(), score);
        Ok(())
    }

    async fn zincrby(&self, key: &str, member: &str, delta: f64) -> StoreResult<f64> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        purge_expired(&mut map, key, now);
        let zset = typed_entry!(map, key, Zset, HashMap::new(), "sorted set")?;
        let score = zset.entry(member.to_string()).or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn zscore(&self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(None);
        }
        match &map.get(key).expect("checked live").value {
            Value::Zset(z) => Ok(z.get(member).copied()),
            _ => Err(Self::wrong_kind(key, "sorted set")),
        }
    }

    async fn zrank(&self, key: &str, member: &str) -> StoreResult<Option<usize>> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(None);
        }
        match &map.get(key).expect("checked live").value {
            Value::Zset(z) => Ok(sorted_members(z)
                .iter()
                .position(|(m, _)| m == member)),
            _ => Err(Self::wrong_kind(key, "sorted set")),
        }
    }

    async fn zcard(&self, key: &str) -> StoreResult<usize> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(0);
        }
        match &map.get(key).expect("checked live").value {
            Value::Zset(z) => Ok(z.len()),
            _ => Err(Self::wrong_kind(key, "sorted set")),
        }
    }

    async fn zrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        Ok(self
            .zrange_with_scores(key, start, stop)
            .await?
            .into_iter()
            .map(|(member, _)| member)
            .collect())
    }

    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> StoreResult<Vec<(String, f64)>> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(Vec::new());
        }
        match &map.get(key).expect("checked live").value {
            Value::Zset(z) => {
                let members = sorted_members(z);
                Ok(match resolve_range(members.len(), start, stop) {
                    Some((lo, hi)) => members[lo..=hi].to_vec(),
                    None => Vec::new(),
                })
            }
            _ => Err(Self::wrong_kind(key, "sorted set")),
        }
    }

    async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(Vec::new());
        }
        match &map.get(key).expect("checked live").value {
            Value::Zset(z) => {
                let mut members = sorted_members(z);
                members.reverse();
                Ok(match resolve_range(members.len(), start, stop) {
                    Some((lo, hi)) => members[lo..=hi]
                        .iter()
                        .map(|(member, _)| member.clone())
                        .collect(),
                    None => Vec::new(),
                })
            }
            _ => Err(Self::wrong_kind(key, "sorted set")),
        }
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(false);
        }
        match &mut map.get_mut(key).expect("checked live").value {
            Value::Zset(z) => {
                let removed = z.remove(member).is_some();
                if z.is_empty() {
                    map.remove(key);
                }
                Ok(removed)
            }
            _ => Err(Self::wrong_kind(key, "sorted set")),
        }
    }

    async fn zremrangebyrank(&self, key: &str, start: i64, stop: i64) -> StoreResult<usize> {
        let now = self.clock.now_secs();
        let mut map = self.lock();
        if !purge_expired(&mut map, key, now) {
            return Ok(0);
        }
        match &mut map.get_mut(key).expect("checked live").value {
            Value::Zset(z) => {
                let members = sorted_members(z);
                let Some((lo, hi)) = resolve_range(members.len(), start, stop) else {
                    return Ok(0);
                };
                for (member, _) in &members[lo..=hi] {
                    z.remove(member);
                }
                if z.is_empty() {
                    map.remove(key);
                }
                Ok(hi - lo + 1)
            }
            _ => Err(Self::wrong_kind(key, "sorted set")),
        }
    }

    async fn zinterstore(
        &self,
        dest: &str,
        sources: &[(&str, f64)],
        aggregate: Aggregate,
    ) -> StoreResult<usize> {
        let now = self.clock.now_secs();
        let mut map = self.lock();

        // Snapshot each source as member -> weighted score
        let mut inputs: Vec<HashMap<String, f64>> = Vec::with_capacity(sources.len());
        for (source, weight) in sources {
            if !purge_expired(&mut map, source, now) {
                inputs.push(HashMap::new());
                continue;
            }
            let weighted = match &map.get(*source).expect("checked live").value {
                Value::Zset(z) => z
                    .iter()
                    .map(|(member, score)| (member.clone(), score * weight))
                    .collect(),
                // Set members contribute an implicit score of 1
                Value::Set(s) => s.iter().map(|member| (member.clone(), *weight)).collect(),
                _ => return Err(Self::wrong_kind(source, "set or sorted set")),
            };
            inputs.push(weighted);
        }

        let mut result: HashMap<String, f64> = HashMap::new();
        if let Some((first, rest)) = inputs.split_first() {
            for (member, score) in first {
                let mut acc = *score;
                let in_all = rest.iter().all(|input| match input.get(member) {
                    Some(other) => {
                        acc = match aggregate {
                            Aggregate::Sum => acc + other,
                            Aggregate::Max => acc.max(*other),
                            Aggregate::Min => acc.min(*other),
                        };
                        true
                    }
                    None => false,
                });
                if in_all {
                    result.insert(member.clone(), acc);
                }
            }
        }

        let cardinality = result.len();
        if result.is_empty() {
            map.remove(dest);
        } else {
            // Overwrite semantics: any previous value and TTL are dropped
            map.insert(dest.to_string(), Entry::live(Value::Zset(result)));
        }
        Ok(cardinality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::starting_at(1_000_000.0);
        let store = MemoryStore::new(Arc::new(clock.clone()));
        (store, clock)
    }

    // =========================================================================
    // String commands
    // =========================================================================

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let (store, _) = store();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let (store, _) = store();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_set_with_ttl_expires() {
        let (store, clock) = store();
        store
            .set_with_ttl("k", "v", Duration::from_secs(300))
            .await
            .unwrap();
        assert!(store.get("k").await.unwrap().is_some());
        clock.advance(301.0);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_incr_allocates_monotonic_ids() {
        let (store, _) = store();
        assert_eq!(store.incr("article:").await.unwrap(), 1);
        assert_eq!(store.incr("article:").await.unwrap(), 2);
        assert_eq!(store.incr("article:").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_incr_non_integer_is_bad_value() {
        let (store, _) = store();
        store.set("k", "not-a-number").await.unwrap();
        assert!(matches!(
            store.incr("k").await,
            Err(StoreError::BadValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_any_kind() {
        let (store, _) = store();
        store.sadd("s", "a").await.unwrap();
        store.delete("s").await.unwrap();
        assert!(!store.exists("s").await.unwrap());
        // Absent key is a no-op, not an error
        store.delete("s").await.unwrap();
    }

    // =========================================================================
    // Kind discipline
    // =========================================================================

    #[tokio::test]
    async fn test_wrong_kind_errors() {
        let (store, _) = store();
        store.set("str", "v").await.unwrap();
        assert!(matches!(
            store.hget("str", "f").await,
            Err(StoreError::WrongKind { .. })
        ));
        assert!(matches!(
            store.sadd("str", "m").await,
            Err(StoreError::WrongKind { .. })
        ));
        assert!(matches!(
            store.zadd("str", "m", 1.0).await,
            Err(StoreError::WrongKind { .. })
        ));
    }

    // =========================================================================
    // Hash commands
    // =========================================================================

    #[tokio::test]
    async fn test_hash_set_get_all() {
        let (store, _) = store();
        store
            .hset_multi(
                "article:1",
                &[
                    ("title", "A title".to_string()),
                    ("votes", "1".to_string()),
                ],
            )
            .await
            .unwrap();
        store.hset("article:1", "link", "http://x").await.unwrap();

        let all = store.hgetall("article:1").await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all["votes"], "1");
        assert_eq!(
            store.hget("article:1", "link").await.unwrap().as_deref(),
            Some("http://x")
        );
    }

    #[tokio::test]
    async fn test_hincrby_counts_from_existing() {
        let (store, _) = store();
        store.hset("h", "votes", "5").await.unwrap();
        assert_eq!(store.hincrby("h", "votes", 1).await.unwrap(), 6);
        assert_eq!(store.hincrby("h", "votes", -2).await.unwrap(), 4);
        // Missing field counts from zero
        assert_eq!(store.hincrby("h", "other", 3).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_hdel_reports_presence() {
        let (store, _) = store();
        store.hset("h", "f", "v").await.unwrap();
        assert!(store.hdel("h", "f").await.unwrap());
        assert!(!store.hdel("h", "f").await.unwrap());
    }

    // =========================================================================
    // Set commands
    // =========================================================================

    #[tokio::test]
    async fn test_sadd_reports_membership_change() {
        let (store, _) = store();
        assert!(store.sadd("voted:1", "user:9").await.unwrap());
        assert!(!store.sadd("voted:1", "user:9").await.unwrap());
        assert!(store.srem("voted:1", "user:9").await.unwrap());
        assert!(!store.srem("voted:1", "user:9").await.unwrap());
    }

    // =========================================================================
    // Sorted set commands
    // =========================================================================

    #[tokio::test]
    async fn test_zrange_orders_ascending_by_score() {
        let (store, _) = store();
        store.zadd("z", "b", 2.0).await.unwrap();
        store.zadd("z", "a", 1.0).await.unwrap();
        store.zadd("z", "c", 3.0).await.unwrap();
        assert_eq!(store.zrange("z", 0, -1).await.unwrap(), ["a", "b", "c"]);
        assert_eq!(store.zrevrange("z", 0, -1).await.unwrap(), ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_zrange_negative_and_out_of_bounds() {
        let (store, _) = store();
        for (m, s) in [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)] {
            store.zadd("z", m, s).await.unwrap();
        }
        assert_eq!(store.zrange("z", 0, 1).await.unwrap(), ["a", "b"]);
        assert_eq!(store.zrange("z", -2, -1).await.unwrap(), ["c", "d"]);
        assert_eq!(store.zrange("z", 10, 20).await.unwrap(), Vec::<String>::new());
        assert_eq!(store.zrevrange("z", 0, 0).await.unwrap(), ["d"]);
    }

    #[tokio::test]
    async fn test_zrank_is_ascending_position() {
        let (store, _) = store();
        store.zadd("z", "cold", 10.0).await.unwrap();
        store.zadd("z", "hot", -50.0).await.unwrap();
        assert_eq!(store.zrank("z", "hot").await.unwrap(), Some(0));
        assert_eq!(store.zrank("z", "cold").await.unwrap(), Some(1));
        assert_eq!(store.zrank("z", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_zincrby_creates_and_adjusts() {
        let (store, _) = store();
        assert_eq!(store.zincrby("z", "m", -1.0).await.unwrap(), -1.0);
        assert_eq!(store.zincrby("z", "m", -1.0).await.unwrap(), -2.0);
        assert_eq!(store.zscore("z", "m").await.unwrap(), Some(-2.0));
    }

    #[tokio::test]
    async fn test_zremrangebyrank_keeps_newest() {
        let (store, _) = store();
        for i in 0..30 {
            store
                .zadd("viewed:t", &format!("item{i}"), i as f64)
                .await
                .unwrap();
        }
        // Trim to the 25 highest-scored entries
        let removed = store.zremrangebyrank("viewed:t", 0, -26).await.unwrap();
        assert_eq!(removed, 5);
        assert_eq!(store.zcard("viewed:t").await.unwrap(), 25);
        assert_eq!(store.zrank("viewed:t", "item4").await.unwrap(), None);
        assert_eq!(store.zrank("viewed:t", "item5").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_zinterstore_set_with_zset_aggregate_max() {
        let (store, _) = store();
        store.sadd("group:g", "article:1").await.unwrap();
        store.sadd("group:g", "article:2").await.unwrap();
        store.zadd("score:", "article:1", 500.0).await.unwrap();
        store.zadd("score:", "article:3", 700.0).await.unwrap();

        let n = store
            .zinterstore("score:g", &[("group:g", 1.0), ("score:", 1.0)], Aggregate::Max)
            .await
            .unwrap();
        assert_eq!(n, 1);
        // max(set's implicit 1, 500) = 500
        assert_eq!(store.zscore("score:g", "article:1").await.unwrap(), Some(500.0));
    }

    #[tokio::test]
    async fn test_zinterstore_self_with_weight_decays_in_place() {
        let (store, _) = store();
        store.zadd("viewed:", "a", -8.0).await.unwrap();
        store.zadd("viewed:", "b", -2.0).await.unwrap();

        let n = store
            .zinterstore("viewed:", &[("viewed:", 0.5)], Aggregate::Sum)
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.zscore("viewed:", "a").await.unwrap(), Some(-4.0));
        assert_eq!(store.zscore("viewed:", "b").await.unwrap(), Some(-1.0));
    }

    #[tokio::test]
    async fn test_zinterstore_empty_intersection_removes_dest() {
        let (store, _) = store();
        store.zadd("dest", "old", 1.0).await.unwrap();
        store.zadd("x", "a", 1.0).await.unwrap();
        store.zadd("y", "b", 1.0).await.unwrap();
        let n = store
            .zinterstore("dest", &[("x", 1.0), ("y", 1.0)], Aggregate::Max)
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(!store.exists("dest").await.unwrap());
    }

    #[tokio::test]
    async fn test_zinterstore_overwrites_dest_ttl() {
        let (store, clock) = store();
        store.zadd("src", "a", 2.0).await.unwrap();
        store
            .zinterstore("dest", &[("src", 1.0)], Aggregate::Max)
            .await
            .unwrap();
        store
            .expire("dest", Duration::from_secs(60))
            .await
            .unwrap();
        // Recompute refreshes the key and drops the old deadline
        store
            .zinterstore("dest", &[("src", 1.0)], Aggregate::Max)
            .await
            .unwrap();
        clock.advance(61.0);
        assert!(store.exists("dest").await.unwrap());
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    #[tokio::test]
    async fn test_expire_on_set_key() {
        let (store, clock) = store();
        store.sadd("voted:1", "user:1").await.unwrap();
        assert!(store
            .expire("voted:1", Duration::from_secs(604_800))
            .await
            .unwrap());
        clock.advance(604_801.0);
        // Expired ledger behaves as absent
        assert!(store.sadd("voted:1", "user:2").await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_absent_key_is_false() {
        let (store, _) = store();
        assert!(!store.expire("nope", Duration::from_secs(1)).await.unwrap());
    }
}
