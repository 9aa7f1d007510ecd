//! Per-worker aggregate collection
//!
//! The point-to-point channel receives one record per worker. The collector
//! keeps those records attributable to the worker that produced them, so a
//! worker that never delivered can be reported instead of being silently
//! folded into the total as zero.

use crate::stats::Aggregate;
use std::collections::BTreeMap;

/// Collects finished aggregates keyed by worker ID
#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    workers: BTreeMap<usize, Aggregate>,
}

impl StatisticsAggregator {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the aggregate delivered by a worker; the first delivery wins
    pub fn add_worker(&mut self, worker_id: usize, stats: Aggregate) {
        self.workers.entry(worker_id).or_insert(stats);
    }

    /// Worker IDs in ascending order, among `0..expected`, that have not delivered
    pub fn missing(&self, expected: usize) -> Vec<usize> {
        (0..expected)
            .filter(|id| !self.workers.contains_key(id))
            .collect()
    }

    /// Fold every delivered aggregate into one
    pub fn aggregate(&self) -> Aggregate {
        self.workers.values().copied().sum()
    }
}
