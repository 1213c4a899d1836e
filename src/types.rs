//! Tagged identifier types and key derivation
//!
//! Every identifier that crosses a subsystem boundary is a newtype, so a
//! session token can never be passed where an article id is expected even
//! though both are string-shaped in the store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known store key names shared across subsystems
pub mod keys {
    /// Counter key from which article ids are allocated
    pub const ARTICLE_ID_COUNTER: &str = "article:";
    /// Sorted mapping `article member -> score` ("hot" ordering)
    pub const SCORE: &str = "score:";
    /// Sorted mapping `article member -> created_at` ("recent" ordering)
    pub const TIME: &str = "time:";
    /// Hash `token -> user` of live session bindings
    pub const LOGIN: &str = "login:";
    /// Sorted mapping `token -> last_seen` (recency index)
    pub const RECENT: &str = "recent:";
    /// Sorted mapping `item -> -views` (global popularity, lower = hotter)
    pub const POPULARITY: &str = "viewed:";
    /// Sorted mapping `row -> refresh interval seconds`
    pub const DELAY: &str = "delay:";
    /// Sorted mapping `row -> next due timestamp`
    pub const SCHEDULE: &str = "schedule:";
}

/// Reference to a user, e.g. `user:83271`
///
/// Opaque to this crate; produced by whatever authenticates requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef(String);

impl UserRef {
    pub fn new(user: impl Into<String>) -> Self {
        Self(user.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a posted article
///
/// Allocated monotonically from the store-side counter at post time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArticleId(u64);

impl ArticleId {
    #[must_use]
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Key of the article's field hash, e.g. `article:42`
    #[must_use]
    pub fn hash_key(&self) -> String {
        format!("article:{}", self.0)
    }

    /// Key of the article's vote ledger set, e.g. `voted:42`
    #[must_use]
    pub fn ledger_key(&self) -> String {
        format!("voted:{}", self.0)
    }

    /// Member string used in the score/time sorted mappings
    ///
    /// Same shape as [`hash_key`](Self::hash_key); index members double as
    /// hash keys when hydrating listings.
    #[must_use]
    pub fn member(&self) -> String {
        self.hash_key()
    }

    /// Parse an index member (`article:<id>`) back into an id
    #[must_use]
    pub fn from_member(member: &str) -> Option<Self> {
        member
            .strip_prefix("article:")
            .and_then(|id| id.parse().ok())
            .map(Self)
    }
}

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag grouping a set of articles, e.g. `programming`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(group: impl Into<String>) -> Self {
        Self(group.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of the group's membership set, e.g. `group:programming`
    #[must_use]
    pub fn set_key(&self) -> String {
        format!("group:{}", self.0)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session cookie token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generate a fresh random token
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key of this session's viewed-items sorted mapping
    #[must_use]
    pub fn viewed_key(&self) -> String {
        format!("viewed:{}", self.0)
    }

    /// Key of this session's cart hash
    #[must_use]
    pub fn cart_key(&self) -> String {
        format!("cart:{}", self.0)
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a viewable/purchasable item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(item: impl Into<String>) -> Self {
        Self(item.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an inventory row managed by the delayed re-cache scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

impl RowId {
    #[must_use]
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    #[inline]
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Member string used in the delay/schedule sorted mappings
    #[must_use]
    pub fn member(&self) -> String {
        self.0.to_string()
    }

    /// Key under which the serialized row snapshot is cached
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("inv:{}", self.0)
    }

    /// Parse a delay/schedule member back into a row id
    #[must_use]
    pub fn from_member(member: &str) -> Option<Self> {
        member.parse().ok().map(Self)
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
