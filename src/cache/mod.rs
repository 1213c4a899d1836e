//! Store-backed caching: delayed inventory row refresh and the
//! popularity-gated page cache

mod page;
mod rows;

pub use page::{PageCache, PageRequest, RequestPolicy, StandardPolicy};
pub use rows::{DelayedRowScheduler, Inventory, SchedulerError, SchedulerTick};
