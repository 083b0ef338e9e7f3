//! Run-scoped memo of candidate costs.

use crate::planner::cost::CostKey;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cost memo keyed by structural cost identity.
///
/// Backed by a concurrent map so candidate generation may price selections
/// from several threads at once. A fresh cache is created per planning run;
/// nothing is shared between runs.
#[derive(Debug, Default)]
pub struct CostCache {
    entries: DashMap<CostKey, f64>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

/// Hit/miss counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
}

impl CostCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached cost for `key`, computing and storing it on a miss.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached.
    pub fn get_or_try_insert<E>(
        &self,
        key: CostKey,
        compute: impl FnOnce(&CostKey) -> Result<f64, E>,
    ) -> Result<f64, E> {
        if let Some(cost) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(*cost);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let cost = compute(&key)?;
        self.entries.insert(key, cost);
        Ok(cost)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
