//! Planning-run caches.
//!
//! - [`CostCache`]: memoized index costs, owned by one planning run and
//!   shared by reference with every component that prices candidates.
//! - [`fingerprint`]: content hash used to compare planning outcomes.

mod cost_cache;
mod hash;

pub use cost_cache::{CacheStats, CostCache};
pub use hash::fingerprint;
