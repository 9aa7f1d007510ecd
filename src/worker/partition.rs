//! Line ownership
//!
//! Workers never coordinate over who processes which line. Each one scans the
//! same input from the top and keeps line `i` only if `i mod N` equals its own
//! ID, which gives a balanced, disjoint and reproducible split.

use crate::error::{PulseError, Result};
use std::num::NonZeroUsize;

/// Worker that owns line `index` when the input is split `worker_count` ways
#[inline]
pub fn owner(index: u64, worker_count: NonZeroUsize) -> usize {
    (index % worker_count.get() as u64) as usize
}

/// One worker's share of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    worker_id: usize,
    worker_count: NonZeroUsize,
}

impl Partition {
    /// Create the partition for `worker_id` out of `worker_count`
    pub fn new(worker_id: usize, worker_count: usize) -> Result<Self> {
        match NonZeroUsize::new(worker_count) {
            Some(count) if worker_id < worker_count => Ok(Self {
                worker_id,
                worker_count: count,
            }),
            _ => Err(PulseError::InvalidPartition {
                worker_id,
                worker_count,
            }),
        }
    }

    /// The no-parallelism partition: one worker owns every line
    pub fn single() -> Self {
        Self {
            worker_id: 0,
            worker_count: NonZeroUsize::MIN,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// True if line `index` belongs to this worker
    #[inline]
    pub fn owns(&self, index: u64) -> bool {
        owner(index, self.worker_count) == self.worker_id
    }
}
