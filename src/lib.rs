//! Time-decayed article ranking and session infrastructure over a shared
//! ordered key-value store
//!
//! Two subsystems share one [`store::OrderedStore`]:
//!
//! - `ranking`: vote-scored article listings with duplicate-vote
//!   prevention and group-scoped pagination backed by a short-lived
//!   intersection cache
//! - `session` and `cache`: capacity-bounded session state with a
//!   background sweeper, a decaying view-popularity index, a delayed row
//!   re-cache scheduler, and a popularity-gated TTL page cache
//!
//! The store trait keeps the subsystems independent of any particular
//! backend; [`store::MemoryStore`] is the bundled implementation.

pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod logging;
pub mod ranking;
pub mod session;
pub mod shutdown;
pub mod store;
pub mod types;

pub use cache::{DelayedRowScheduler, Inventory, PageCache, PageRequest, StandardPolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, Config};
pub use ranking::{Article, ArticleRanking, GroupIndex, RankOrder};
pub use session::{SessionRegistry, SessionSweeper, ViewPopularityTracker};
pub use shutdown::Shutdown;
pub use store::{MemoryStore, OrderedStore, StoreError};
pub use types::{ArticleId, GroupId, ItemId, RowId, SessionToken, UserRef};
