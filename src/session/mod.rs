//! Session state: token bindings, recency, views, carts
//!
//! The registry writes session-scoped state on every authenticated
//! request; the sweeper bounds the number of live sessions by evicting the
//! oldest; the popularity tracker turns per-session view events into a
//! global decaying ranking that gates page-cache admission.

mod popularity;
mod registry;
mod sweeper;

pub use popularity::ViewPopularityTracker;
pub use registry::SessionRegistry;
pub use sweeper::SessionSweeper;
