//! TTL page cache with popularity-gated admission
//!
//! Only requests about sufficiently popular items are cached at all;
//! everything else is computed fresh with no cache side effects. What
//! counts as cacheable, and how a request maps to a key, is a per-request
//! -shape policy the caller plugs in.

use crate::constants::page_cache::CONTENT_TTL_SECS;
use crate::session::ViewPopularityTracker;
use crate::store::{OrderedStore, StoreResult};
use crate::types::ItemId;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Cacheability classification and key hashing for a request shape `R`
pub trait RequestPolicy<R>: Send + Sync + std::fmt::Debug {
    /// The item this request is about, or `None` if its shape is never
    /// cacheable (dynamic pages, requests with no subject item)
    fn cacheable_item(&self, request: &R) -> Option<ItemId>;

    /// Deterministic request hash; distinct requests must not collide in
    /// practice, equal requests must hash equally
    fn hash_request(&self, request: &R) -> u64;
}

/// Admission-gated page cache over the shared store
#[derive(Debug, Clone)]
pub struct PageCache<R> {
    store: Arc<dyn OrderedStore>,
    popularity: ViewPopularityTracker,
    policy: Arc<dyn RequestPolicy<R>>,
}

impl<R> PageCache<R> {
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderedStore>,
        popularity: ViewPopularityTracker,
        policy: Arc<dyn RequestPolicy<R>>,
    ) -> Self {
        Self {
            store,
            popularity,
            policy,
        }
    }

    /// Serve a request through the cache
    ///
    /// Uncacheable or unpopular requests bypass the cache entirely, with
    /// no cache writes. Otherwise a hit returns the stored content and a
    /// miss computes, stores with a 300 second TTL, and returns it.
    pub async fn serve<F, Fut>(&self, request: &R, compute: F) -> StoreResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = String>,
    {
        let Some(item) = self.policy.cacheable_item(request) else {
            trace!("request shape not cacheable, bypassing");
            return Ok(compute().await);
        };
        if !self.popularity.is_cache_eligible(&item).await? {
            trace!(item = %item, "item below admission cutoff, bypassing");
            return Ok(compute().await);
        }

        let key = format!("cache:{:016x}", self.policy.hash_request(request));
        if let Some(content) = self.store.get(&key).await? {
            debug!(%key, "page cache hit");
            return Ok(content);
        }

        let content = compute().await;
        self.store
            .set_with_ttl(&key, &content, Duration::from_secs(CONTENT_TTL_SECS))
            .await?;
        debug!(%key, "page cache fill");
        Ok(content)
    }
}

/// A minimal cacheable-page request: an URL plus what it is about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub url: String,
    /// Subject item, if the page is about one
    pub item: Option<ItemId>,
    /// Dynamic pages are never cached regardless of their item
    pub dynamic: bool,
}

/// Default policy for [`PageRequest`]: static pages about an item are
/// cacheable, keyed by a hash of the full URL
///
/// The hash is stable within a process; deployments sharing one store
/// across processes should plug in a policy with a portable hash.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardPolicy;

impl RequestPolicy<PageRequest> for StandardPolicy {
    fn cacheable_item(&self, request: &PageRequest) -> Option<ItemId> {
        if request.dynamic {
            return None;
        }
        request.item.clone()
    }

    fn hash_request(&self, request: &PageRequest) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        request.url.hash(&mut hasher);
        hasher.finish()
    }
}
