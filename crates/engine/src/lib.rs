//! Aggregation engine.
//!
//! Every function here is pure: it borrows a transaction list, never mutates
//! it, performs no I/O and never fails. Empty input yields zeroed results.
//!
//! "Current month" is always evaluated in the time zone of the `now` handed
//! in by the caller, so the same list can be summarized for any user locale.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//!
//! let now = Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap();
//! let summary = engine::summarize(&[], &now);
//! assert_eq!(summary, engine::Summary::default());
//! ```
pub use api_types::Money;
pub use categories::{CategoryShare, CategoryTotals, category_breakdown, category_shares};
pub use statistics::{MonthlyTotals, Statistics, recent, statistics};
pub use summary::{Summary, is_same_month, summarize};

mod categories;
mod statistics;
mod summary;
