//! Aggregation channels
//!
//! An aggregation channel carries each finished worker's local [`Aggregate`]
//! back to the coordinator. Two strategies implement the same trait, so the
//! worker and coordinator code is written once:
//!
//! - **Shared-region**: one aggregate in shared memory; every worker merges
//!   into it under a process-shared semaphore.
//! - **Point-to-point**: one pipe per worker; every worker writes a single
//!   fixed-size record and the coordinator folds them.
//!
//! # Fork lifecycle
//!
//! The coordinator creates the channel before forking. In each child it calls
//! [`AggregationChannel::attach_worker`]; in the parent it calls
//! [`AggregationChannel::worker_spawned`] right after each fork. Once every
//! worker has been reaped as finished, it calls
//! [`AggregationChannel::collect_final`].

pub mod pipe;
pub mod shared;

use crate::error::Result;
use crate::stats::Aggregate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use pipe::PointToPointChannel;
pub use shared::SharedRegionChannel;

/// Aggregation strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelKind {
    #[default]
    SharedRegion,
    PointToPoint,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedRegion => write!(f, "shared-region"),
            Self::PointToPoint => write!(f, "point-to-point"),
        }
    }
}

/// Transport for finished worker aggregates
pub trait AggregationChannel {
    /// Strategy implemented by this channel
    fn kind(&self) -> ChannelKind;

    /// Called in the worker process right after fork
    ///
    /// Lets the channel drop resources the worker must not hold.
    fn attach_worker(&mut self, _worker_id: usize) -> Result<()> {
        Ok(())
    }

    /// Called in the coordinator right after `worker_id` was forked
    fn worker_spawned(&mut self, _worker_id: usize) -> Result<()> {
        Ok(())
    }

    /// Deliver a worker's finished aggregate; called once per worker
    fn submit_local(&mut self, worker_id: usize, local: &Aggregate) -> Result<()>;

    /// Combined aggregate of every delivery
    ///
    /// Only valid in the coordinator after all workers were reaped as finished.
    fn collect_final(&mut self) -> Result<Aggregate>;
}

/// Create the channel for `worker_count` workers
pub fn create_channel(kind: ChannelKind, worker_count: usize) -> Result<Box<dyn AggregationChannel>> {
    let channel: Box<dyn AggregationChannel> = match kind {
        ChannelKind::SharedRegion => Box::new(SharedRegionChannel::new()?),
        ChannelKind::PointToPoint => Box::new(PointToPointChannel::new(worker_count)?),
    };
    tracing::debug!(channel = %kind, workers = worker_count, "aggregation channel ready");
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_kind_display() {
        assert_eq!(ChannelKind::SharedRegion.to_string(), "shared-region");
        assert_eq!(ChannelKind::PointToPoint.to_string(), "point-to-point");
        assert_eq!(ChannelKind::default(), ChannelKind::SharedRegion);
    }

    #[test]
    fn test_create_channel_kinds() {
        for kind in [ChannelKind::SharedRegion, ChannelKind::PointToPoint] {
            let channel = create_channel(kind, 3).unwrap();
            assert_eq!(channel.kind(), kind);
        }
    }

    #[test]
    fn test_in_process_strategies_agree() {
        let parts = [
            Aggregate { sum: 0.1, count: 1, unknown: 2 },
            Aggregate { sum: 0.5, count: 3, unknown: 0 },
            Aggregate { sum: 0.0, count: 0, unknown: 1 },
        ];

        let mut totals = Vec::new();
        for kind in [ChannelKind::SharedRegion, ChannelKind::PointToPoint] {
            let mut channel = create_channel(kind, parts.len()).unwrap();
            for (id, part) in parts.iter().enumerate() {
                channel.submit_local(id, part).unwrap();
            }
            totals.push(channel.collect_final().unwrap());
        }

        for total in totals {
            assert_eq!(total.count, 4);
            assert_eq!(total.unknown, 3);
            assert!((total.sum - 0.6).abs() < 1e-12);
        }
    }
}
