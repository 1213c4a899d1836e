//! Token-to-user bindings and per-session activity state

use super::ViewPopularityTracker;
use crate::clock::Clock;
use crate::constants::session::VIEWED_PER_SESSION;
use crate::store::{OrderedStore, StoreResult};
use crate::types::{keys, ItemId, SessionToken, UserRef};
use std::sync::Arc;
use tracing::trace;

/// Session token registry
///
/// `update_token` is called on every authenticated request: it refreshes
/// the binding and recency index, and optionally records an item view both
/// against the session's own history and the global popularity index.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    store: Arc<dyn OrderedStore>,
    clock: Arc<dyn Clock>,
    popularity: ViewPopularityTracker,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        store: Arc<dyn OrderedStore>,
        clock: Arc<dyn Clock>,
        popularity: ViewPopularityTracker,
    ) -> Self {
        Self {
            store,
            clock,
            popularity,
        }
    }

    /// Resolve a token to its bound user, if the session is still live
    pub async fn check_token(&self, token: &SessionToken) -> StoreResult<Option<UserRef>> {
        Ok(self
            .store
            .hget(keys::LOGIN, token.as_str())
            .await?
            .map(UserRef::new))
    }

    /// Bind `token` to `user` and mark it as just seen
    ///
    /// When `viewed` is given, the item is appended to the session's
    /// viewed history (trimmed to its 25 newest entries) and counted once
    /// against the global popularity index.
    pub async fn update_token(
        &self,
        token: &SessionToken,
        user: &UserRef,
        viewed: Option<&ItemId>,
    ) -> StoreResult<()> {
        let now = self.clock.now_secs();

        self.store
            .hset(keys::LOGIN, token.as_str(), user.as_str())
            .await?;
        self.store.zadd(keys::RECENT, token.as_str(), now).await?;

        if let Some(item) = viewed {
            let viewed_key = token.viewed_key();
            self.store.zadd(&viewed_key, item.as_str(), now).await?;
            // Keep only the newest entries; everything below the cutoff
            // rank is the oldest overflow
            self.store
                .zremrangebyrank(&viewed_key, 0, -(VIEWED_PER_SESSION as i64 + 1))
                .await?;
            self.popularity.record_view(item).await?;
            trace!(token = %token, item = %item, "view recorded");
        }
        Ok(())
    }

    /// Set or clear a cart line: a non-positive count removes the line
    pub async fn add_to_cart(
        &self,
        token: &SessionToken,
        item: &ItemId,
        count: i64,
    ) -> StoreResult<()> {
        let cart_key = token.cart_key();
        if count <= 0 {
            self.store.hdel(&cart_key, item.as_str()).await?;
        } else {
            self.store
                .hset(&cart_key, item.as_str(), &count.to_string())
                .await?;
        }
        Ok(())
    }
}
