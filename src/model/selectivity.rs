//! Selectivity statistics and expected-scan distributions.

use std::fmt;
use std::sync::Arc;

/// One-tailed z-score for the 95th percentile.
pub const Z_95: f64 = 1.645;

/// Strategy for estimating how many rows must be scanned to collect
/// `page_size` matches when the residual attribute has `distinct` values.
pub trait Distribution: fmt::Debug + Send + Sync {
    fn expected(&self, page_size: u32, distinct: u64) -> f64;
}

/// Uniformly distributed values with a one-sided normal bound.
///
/// `expected = z * (page_size / (1 / distinct))`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformDistribution {
    pub z: f64,
}

impl Default for UniformDistribution {
    fn default() -> Self {
        Self { z: Z_95 }
    }
}

impl Distribution for UniformDistribution {
    fn expected(&self, page_size: u32, distinct: u64) -> f64 {
        let match_probability = 1.0 / distinct.max(1) as f64;
        self.z * (f64::from(page_size) / match_probability)
    }
}

/// Distinct-value estimate for a set of paths.
#[derive(Debug, Clone)]
pub struct Selectivity {
    pub distinct: u64,
    pub distribution: Arc<dyn Distribution>,
    /// Values are known to be skewed toward a few keys.
    pub hotspot: bool,
    /// Probability attached to the statistic by the schema author.
    pub prob: f64,
}

impl Selectivity {
    pub fn uniform(distinct: u64) -> Self {
        Self {
            distinct,
            distribution: Arc::new(UniformDistribution::default()),
            hotspot: false,
            prob: 1.0,
        }
    }

    pub fn with_distribution(distinct: u64, distribution: Arc<dyn Distribution>) -> Self {
        Self {
            distinct,
            distribution,
            hotspot: false,
            prob: 1.0,
        }
    }

    pub fn expected(&self, page_size: u32) -> f64 {
        self.distribution.expected(page_size, self.distinct)
    }
}
