//! Article posting, voting, and paginated listing

use super::RankOrder;
use crate::clock::Clock;
use crate::constants::ranking::{
    ARTICLES_PER_PAGE, DOWNVOTE_PENALTY, VOTE_SCORE, VOTING_WINDOW_SECS,
};
use crate::store::{OrderedStore, StoreError, StoreResult};
use crate::types::{keys, ArticleId, UserRef};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Hydrated article snapshot as returned by listings
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub link: String,
    pub poster: UserRef,
    /// Creation timestamp, seconds since the Unix epoch
    pub posted_at: f64,
    pub votes: i64,
}

impl Article {
    /// Build a snapshot from the raw field hash; `None` if the record is
    /// gone (index members can outlive their hash)
    fn from_fields(id: ArticleId, mut fields: HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        Some(Self {
            id,
            title: fields.remove("title").unwrap_or_default(),
            link: fields.remove("link").unwrap_or_default(),
            poster: UserRef::new(fields.remove("poster").unwrap_or_default()),
            posted_at: fields
                .remove("time")
                .and_then(|t| t.parse().ok())
                .unwrap_or_default(),
            votes: fields
                .remove("votes")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        })
    }
}

/// Article creation and vote/downvote with duplicate prevention
///
/// The only atomicity guarantee is the ledger membership change: `sadd`
/// / `srem` returning true is what licenses the follow-up score and count
/// updates. Those follow-ups can interleave with a concurrent opposite
/// vote on the same article, a narrow accepted window; the ledger never
/// double-counts a user.
#[derive(Debug, Clone)]
pub struct ArticleRanking {
    store: Arc<dyn OrderedStore>,
    clock: Arc<dyn Clock>,
}

impl ArticleRanking {
    #[must_use]
    pub fn new(store: Arc<dyn OrderedStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Post a new article, with the poster as its implicit first voter
    pub async fn post(&self, user: &UserRef, title: &str, link: &str) -> StoreResult<ArticleId> {
        let raw = self.store.incr(keys::ARTICLE_ID_COUNTER).await?;
        let id = ArticleId::new(u64::try_from(raw).map_err(|_| StoreError::BadValue {
            key: keys::ARTICLE_ID_COUNTER.to_string(),
            reason: format!("id counter returned {raw}"),
        })?);

        // The ledger expires with the voting window; once votes close the
        // voter list has no further use
        let ledger = id.ledger_key();
        self.store.sadd(&ledger, user.as_str()).await?;
        self.store
            .expire(&ledger, Duration::from_secs_f64(VOTING_WINDOW_SECS))
            .await?;

        let now = self.clock.now_secs();
        self.store
            .hset_multi(
                &id.hash_key(),
                &[
                    ("title", title.to_string()),
                    ("link", link.to_string()),
                    ("poster", user.to_string()),
                    ("time", now.to_string()),
                    ("votes", "1".to_string()),
                ],
            )
            .await?;

        let member = id.member();
        self.store
            .zadd(keys::SCORE, &member, now + VOTE_SCORE)
            .await?;
        self.store.zadd(keys::TIME, &member, now).await?;

        debug!(article = %id, poster = %user, "posted article");
        Ok(id)
    }

    /// Record an upvote; a no-op outside the voting window or when the
    /// user already voted
    pub async fn vote(&self, user: &UserRef, article: ArticleId) -> StoreResult<()> {
        if !self.within_voting_window(article).await? {
            trace!(article = %article, "vote outside window ignored");
            return Ok(());
        }

        // First-vote guard: only the call that changes membership counts
        if self.store.sadd(&article.ledger_key(), user.as_str()).await? {
            self.store
                .zincrby(keys::SCORE, &article.member(), VOTE_SCORE)
                .await?;
            self.store
                .hincrby(&article.hash_key(), "votes", 1)
                .await?;
            debug!(article = %article, voter = %user, "vote recorded");
        }
        Ok(())
    }

    /// Record a downvote; a no-op outside the voting window or when the
    /// user never voted
    ///
    /// The penalty is deliberately steeper than the upvote increment.
    pub async fn downvote(&self, user: &UserRef, article: ArticleId) -> StoreResult<()> {
        if !self.within_voting_window(article).await? {
            trace!(article = %article, "downvote outside window ignored");
            return Ok(());
        }

        if self.store.srem(&article.ledger_key(), user.as_str()).await? {
            self.store
                .zincrby(keys::SCORE, &article.member(), -DOWNVOTE_PENALTY)
                .await?;
            self.store
                .hincrby(&article.hash_key(), "votes", -1)
                .await?;
            debug!(article = %article, voter = %user, "downvote recorded");
        }
        Ok(())
    }

    /// One page of articles (1-indexed), best first under `order`
    ///
    /// Pages past the end are empty, never an error.
    pub async fn list(&self, page: usize, order: RankOrder) -> StoreResult<Vec<Article>> {
        self.list_by_key(page, order.key()).await
    }

    /// Listing against an arbitrary sorted index key
    ///
    /// Group listings delegate here with their cached intersection key.
    pub(crate) async fn list_by_key(&self, page: usize, index: &str) -> StoreResult<Vec<Article>> {
        let start = page.saturating_sub(1) * ARTICLES_PER_PAGE;
        let end = start + ARTICLES_PER_PAGE - 1;

        let members = self
            .store
            .zrevrange(index, start as i64, end as i64)
            .await?;

        let mut articles = Vec::with_capacity(members.len());
        for member in members {
            let Some(id) = ArticleId::from_member(&member) else {
                continue;
            };
            let fields = self.store.hgetall(&member).await?;
            if let Some(article) = Article::from_fields(id, fields) {
                articles.push(article);
            }
        }
        Ok(articles)
    }

    /// Whether the article still accepts votes
    ///
    /// Unknown articles report false and are treated the same as stale
    /// ones: silently ignored.
    async fn within_voting_window(&self, article: ArticleId) -> StoreResult<bool> {
        let cutoff = self.clock.now_secs() - VOTING_WINDOW_SECS;
        Ok(self
            .store
            .zscore(keys::TIME, &article.member())
            .await?
            .is_some_and(|posted_at| posted_at >= cutoff))
    }
}
