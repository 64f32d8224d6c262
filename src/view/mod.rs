//! Derived dashboard state.
//!
//! Pure functions over a collection and the filter state: filtering and
//! search, worker names for the selector, aggregate counts and overdue
//! detection. `DashboardView` memoizes them for the render loop.

mod dashboard;
mod filter;
mod overdue;
mod stats;

pub use dashboard::{DashboardView, Derived};
pub use filter::{FilterState, StatusFilter};
pub use overdue::{order_is_overdue, parse_date, today_local};
pub use stats::Stats;
