//! Latency statistics
//!
//! The [`Aggregate`] is the only piece of data that crosses process boundaries
//! during a run. Every worker builds one locally, and the coordinator ends up
//! with one combined instance, either read back from the shared region or
//! folded from point-to-point records.
//!
//! # Example
//!
//! ```
//! use urlpulse::stats::Aggregate;
//!
//! let mut a = Aggregate::new();
//! a.record_latency(0.1);
//! a.record_unknown();
//!
//! let mut b = Aggregate::new();
//! b.record_latency(0.3);
//!
//! a.merge(&b);
//! assert_eq!(a.count, 2);
//! assert_eq!(a.unknown, 1);
//! assert!((a.average().unwrap() - 0.2).abs() < 1e-9);
//! ```

pub mod aggregator;

use serde::{Deserialize, Serialize};

/// Running totals for a set of probed URLs
///
/// The layout is `#[repr(C)]` because the shared-region channel places an
/// instance in memory mapped into every worker process.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Sum of measured latencies in seconds
    pub sum: f64,
    /// Number of URLs with a latency measurement
    pub count: u64,
    /// Number of URLs that could not be measured
    pub unknown: u64,
}

impl Aggregate {
    /// Create a zero-valued aggregate
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful probe
    ///
    /// Negative values are clamped to zero so `sum` stays non-negative.
    #[inline]
    pub fn record_latency(&mut self, seconds: f64) {
        self.sum += seconds.max(0.0);
        self.count += 1;
    }

    /// Record a probe that could not be measured
    #[inline]
    pub fn record_unknown(&mut self) {
        self.unknown += 1;
    }

    /// Add another aggregate's totals into this one
    ///
    /// Plain field-wise addition, so merging is commutative and associative
    /// (up to floating-point summation order for `sum`).
    pub fn merge(&mut self, other: &Aggregate) {
        self.sum += other.sum;
        self.count += other.count;
        self.unknown += other.unknown;
    }

    /// Average latency in seconds, or `None` when nothing was measured
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    /// Total number of classified URLs (measured + unknown)
    pub fn total(&self) -> u64 {
        self.count + self.unknown
    }

    /// True if no URL has been classified yet
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::iter::Sum for Aggregate {
    fn sum<I: Iterator<Item = Aggregate>>(iter: I) -> Self {
        iter.fold(Aggregate::new(), |mut acc, a| {
            acc.merge(&a);
            acc
        })
    }
}
