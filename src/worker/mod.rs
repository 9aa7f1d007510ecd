//! Worker implementation
//!
//! A worker owns one [`Partition`] of the input. It scans every line in
//! arrival order, classifies the lines it owns, and keeps a local
//! [`Aggregate`]. The worker itself knows nothing about processes: the
//! coordinator runs it inside a forked child (or inline when there is only
//! one worker) and takes care of the hand-off.
//!
//! # State machine
//!
//! ```text
//!             ┌──────── Latency / Unknown ────────┐
//!             ▼                                   │
//!   Running ──── owned line ──► Classify ─────────┘
//!      │                          │
//!      │ input exhausted          │ Invalid
//!      ▼                          ▼
//!   Finished                   Aborted
//!
//!   Running ── abort already raised ──► Cancelled
//! ```
//!
//! Only a `Finished` worker hands off its aggregate, and only once.
//!
//! # Example
//!
//! ```
//! use urlpulse::probe::{Classification, mock::ScriptedClassifier};
//! use urlpulse::source::{LineSource, MemorySource};
//! use urlpulse::worker::{Worker, WorkerOutcome, partition::Partition};
//!
//! let (mut classifier, lines) = ScriptedClassifier::from_results(&[
//!     Classification::Latency(0.1),
//!     Classification::Unknown,
//!     Classification::Latency(0.3),
//! ]);
//! let source = MemorySource::new(lines);
//!
//! let mut worker = Worker::new(Partition::single());
//! let outcome = worker.run(source.lines()?, &mut classifier, None)?;
//!
//! match outcome {
//!     WorkerOutcome::Finished(aggregate) => {
//!         assert_eq!(aggregate.count, 2);
//!         assert_eq!(aggregate.unknown, 1);
//!     }
//!     other => panic!("unexpected outcome: {:?}", other),
//! }
//! # Ok::<(), urlpulse::error::PulseError>(())
//! ```

pub mod partition;

use crate::channel::AggregationChannel;
use crate::coordinator::abort::AbortSignal;
use crate::error::{PulseError, Result};
use crate::probe::{Classification, Classifier};
use crate::source::Lines;
use crate::stats::Aggregate;
use partition::Partition;

/// Lifecycle state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Finished,
    Aborted,
    Cancelled,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Result of running a worker over its partition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorkerOutcome {
    /// Input exhausted; the local aggregate is ready for hand-off
    Finished(Aggregate),
    /// This worker classified an invalid URL at `line` and raised the abort
    Aborted { line: u64 },
    /// Another worker aborted the run; stopped before classifying `line`
    Cancelled { line: u64 },
}

/// A single partition's probe loop
#[derive(Debug)]
pub struct Worker {
    partition: Partition,
    local: Aggregate,
    state: WorkerState,
    handed_off: bool,
}

impl Worker {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            local: Aggregate::new(),
            state: WorkerState::Running,
            handed_off: false,
        }
    }

    pub fn id(&self) -> usize {
        self.partition.worker_id()
    }


    /// Drive the classifier over every owned line
    ///
    /// Unowned lines are consumed and skipped. With an abort signal, the worker
    /// stops as soon as a sibling has raised it, and raises it itself on an
    /// invalid URL. Read errors from the input are returned as errors; they
    /// are worker failures, not aborts.
    pub fn run<C>(
        &mut self,
        lines: Lines<'_>,
        classifier: &mut C,
        abort: Option<&AbortSignal>,
    ) -> Result<WorkerOutcome>
    where
        C: Classifier + ?Sized,
    {
        if self.state.is_terminal() {
            return Err(PulseError::Channel(format!(
                "worker {} already ran ({:?})",
                self.id(),
                self.state
            )));
        }

        for (index, line) in lines.enumerate() {
            let index = index as u64;
            let line = line?;

            if !self.partition.owns(index) {
                continue;
            }

            if abort.is_some_and(|signal| signal.is_raised()) {
                self.state = WorkerState::Cancelled;
                tracing::debug!(worker = self.id(), line = index, "abort observed, stopping");
                return Ok(WorkerOutcome::Cancelled { line: index });
            }

            match classifier.classify(&line) {
                Classification::Latency(secs) => self.local.record_latency(secs),
                Classification::Unknown => self.local.record_unknown(),
                Classification::Invalid => {
                    self.state = WorkerState::Aborted;
                    let first = abort.map_or(true, |signal| signal.raise(self.id(), index));
                    tracing::debug!(worker = self.id(), line = index, first, url = %line, "invalid URL");
                    return Ok(WorkerOutcome::Aborted { line: index });
                }
            }
        }

        self.state = WorkerState::Finished;
        tracing::debug!(
            worker = self.id(),
            count = self.local.count,
            unknown = self.local.unknown,
            "partition finished"
        );
        Ok(WorkerOutcome::Finished(self.local))
    }

    /// Submit the finished aggregate to the channel
    ///
    /// Fails unless the worker is `Finished` and has not handed off yet.
    pub fn hand_off(&mut self, channel: &mut dyn AggregationChannel) -> Result<()> {
        if self.state != WorkerState::Finished {
            return Err(PulseError::Channel(format!(
                "worker {} cannot hand off in state {:?}",
                self.id(),
                self.state
            )));
        }
        if self.handed_off {
            return Err(PulseError::Channel(format!(
                "worker {} already handed off",
                self.id()
            )));
        }

        channel.submit_local(self.id(), &self.local)?;
        self.handed_off = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::mock::ScriptedClassifier;
    use crate::source::{LineSource, MemorySource};
    use Classification::*;

    fn run_worker(
        results: &[Classification],
        partition: Partition,
        abort: Option<&AbortSignal>,
    ) -> (Worker, WorkerOutcome, ScriptedClassifier) {
        let (mut classifier, lines) = ScriptedClassifier::from_results(results);
        let source = MemorySource::new(lines);
        let mut worker = Worker::new(partition);
        let outcome = worker
            .run(source.lines().unwrap(), &mut classifier, abort)
            .unwrap();
        (worker, outcome, classifier)
    }

    #[test]
    fn test_single_worker_accumulates_everything() {
        let (worker, outcome, classifier) = run_worker(
            &[Latency(0.1), Latency(0.2), Unknown, Latency(0.3)],
            Partition::single(),
            None,
        );

        assert_eq!(worker.state, WorkerState::Finished);
        assert_eq!(classifier.calls(), 4);
        match outcome {
            WorkerOutcome::Finished(agg) => {
                assert_eq!(agg.count, 3);
                assert_eq!(agg.unknown, 1);
                assert!((agg.sum - 0.6).abs() < 1e-12);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_worker_only_classifies_owned_lines() {
        let results = [Latency(0.1), Latency(0.2), Latency(0.3), Latency(0.4), Latency(0.5)];
        let (_, outcome, classifier) = run_worker(&results, Partition::new(1, 2).unwrap(), None);

        assert_eq!(
            classifier.seen(),
            &["http://site-1.test/", "http://site-3.test/"]
        );
        match outcome {
            WorkerOutcome::Finished(agg) => {
                assert_eq!(agg.count, 2);
                assert!((agg.sum - 0.6).abs() < 1e-12);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_invalid_aborts_and_raises_signal() {
        let signal = AbortSignal::new().unwrap();
        let (worker, outcome, classifier) = run_worker(
            &[Latency(0.1), Invalid, Latency(0.3)],
            Partition::single(),
            Some(&signal),
        );

        assert_eq!(outcome, WorkerOutcome::Aborted { line: 1 });
        assert_eq!(worker.state, WorkerState::Aborted);
        // Stops immediately: the line after the invalid one is never probed
        assert_eq!(classifier.calls(), 2);
        let report = signal.report().unwrap();
        assert_eq!((report.worker, report.line), (0, 1));
    }

    #[test]
    fn test_unowned_invalid_line_is_ignored() {
        let (_, outcome, _) = run_worker(
            &[Latency(0.1), Invalid, Latency(0.3)],
            Partition::new(0, 2).unwrap(),
            None,
        );
        assert!(matches!(outcome, WorkerOutcome::Finished(_)));
    }

    #[test]
    fn test_cancelled_when_sibling_aborted() {
        let signal = AbortSignal::new().unwrap();
        signal.raise(3, 0);

        let (worker, outcome, classifier) = run_worker(
            &[Latency(0.1), Latency(0.2)],
            Partition::new(1, 2).unwrap(),
            Some(&signal),
        );

        assert_eq!(outcome, WorkerOutcome::Cancelled { line: 1 });
        assert_eq!(worker.state, WorkerState::Cancelled);
        assert_eq!(classifier.calls(), 0);
    }

    #[test]
    fn test_empty_input_finishes_with_zero() {
        let (_, outcome, _) = run_worker(&[], Partition::single(), None);
        assert_eq!(outcome, WorkerOutcome::Finished(Aggregate::new()));
    }

    #[test]
    fn test_run_twice_rejected() {
        let (mut worker, _, mut classifier) =
            run_worker(&[Latency(0.1)], Partition::single(), None);
        let source = MemorySource::new(["http://again"]);
        assert!(worker.run(source.lines().unwrap(), &mut classifier, None).is_err());
    }

    #[test]
    fn test_read_error_propagates() {
        let lines: Lines<'_> = Box::new(
            vec![
                Ok("http://a".to_string()),
                Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "bad utf-8")),
            ]
            .into_iter(),
        );
        let mut classifier = ScriptedClassifier::new("http");
        let mut worker = Worker::new(Partition::single());

        let err = worker.run(lines, &mut classifier, None).unwrap_err();
        assert!(matches!(err, PulseError::Io(_)));
    }
}
