//! Synchronization cache for work order queries.
//!
//! This module keeps the last fetched collection per query key and mediates
//! every read of work order data:
//! - One entry per key, with filtered keys nested under the full collection
//! - Deduplicated fetches (at most one in flight per key)
//! - Stale-while-revalidate reads after invalidation
//! - Invalidation driven by collection-changed events

mod key;
mod snapshot;
mod store;

pub use key::QueryKey;
pub use snapshot::{QuerySnapshot, QueryStatus};
pub use store::{Collection, QueryCache};
