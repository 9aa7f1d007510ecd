//! Output module
//!
//! Turns a run outcome into a [`Report`] and renders it as text or JSON.

pub mod json;
pub mod text;

use crate::channel::ChannelKind;
use crate::coordinator::abort::AbortReport;
use crate::coordinator::RunOutcome;
use crate::stats::Aggregate;
use serde::Serialize;

/// Final result of a run as presented to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Report {
    Completed {
        /// Mean latency in seconds; `None` when no site answered
        average_secs: Option<f64>,
        sites: u64,
        unknown: u64,
        workers: usize,
        channel: ChannelKind,
    },
    Aborted {
        worker: usize,
        /// 1-based line number of the invalid URL
        line: u64,
        workers: usize,
        channel: ChannelKind,
    },
}

impl Report {
    pub fn from_aggregate(total: &Aggregate, workers: usize, channel: ChannelKind) -> Self {
        Report::Completed {
            average_secs: total.average(),
            sites: total.count,
            unknown: total.unknown,
            workers,
            channel,
        }
    }

    pub fn from_abort(report: &AbortReport, workers: usize, channel: ChannelKind) -> Self {
        Report::Aborted {
            worker: report.worker,
            line: report.line + 1,
            workers,
            channel,
        }
    }

    pub fn from_outcome(outcome: &RunOutcome, workers: usize, channel: ChannelKind) -> Self {
        match outcome {
            RunOutcome::Completed(total) => Self::from_aggregate(total, workers, channel),
            RunOutcome::Aborted(report) => Self::from_abort(report, workers, channel),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Report::Aborted { .. })
    }
}
