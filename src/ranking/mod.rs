//! Time-decayed article ranking
//!
//! Articles live in the store as a field hash plus two sorted indexes: one
//! by score ("hot") and one by creation time ("recent"). A per-article
//! ledger set prevents duplicate votes; group tags compose with either
//! index through a TTL-cached intersection.

mod articles;
mod groups;

pub use articles::{Article, ArticleRanking};
pub use groups::GroupIndex;

use crate::types::keys;

/// Base ordering for article listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankOrder {
    /// Descending by vote-adjusted score ("hot")
    Score,
    /// Descending by creation time ("recent")
    Time,
}

impl RankOrder {
    /// Store key of the backing sorted index
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            RankOrder::Score => keys::SCORE,
            RankOrder::Time => keys::TIME,
        }
    }
}

impl std::fmt::Display for RankOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankOrder::Score => write!(f, "score"),
            RankOrder::Time => write!(f, "time"),
        }
    }
}
