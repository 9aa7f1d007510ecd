//! Coordinator module
//!
//! Forks the workers, wires the aggregation channel, reaps the workers and
//! produces the combined aggregate.
//!
//! # Architecture
//!
//! ```text
//!                      ┌──────────────────┐
//!                      │   Coordinator    │
//!                      │ abort signal +   │
//!                      │ channel (owner)  │
//!                      └────────┬─────────┘
//!                   fork        │        fork
//!            ┌──────────────────┼──────────────────┐
//!      ┌─────▼─────┐      ┌─────▼─────┐      ┌─────▼─────┐
//!      │ Worker 0  │      │ Worker 1  │      │ Worker N  │
//!      │ lines 0,N │      │ 1,N+1,... │      │    ...    │
//!      └───────────┘      └───────────┘      └───────────┘
//! ```
//!
//! With one worker there is no fork, no channel and no shared state: the
//! worker runs inline and its aggregate is the result.
//!
//! # Group abort
//!
//! A worker that classifies an invalid URL raises the shared [`AbortSignal`]
//! and exits. The coordinator notices either the signal or the exit while
//! polling, sends SIGTERM to every worker still running, reaps them and
//! returns [`RunOutcome::Aborted`]. No aggregate is read on that path.

pub mod abort;
pub mod reap;

use crate::channel::{create_channel, AggregationChannel, ChannelKind};
use crate::config::RunConfig;
use crate::error::{PulseError, Result};
use crate::probe::Classifier;
use crate::source::LineSource;
use crate::stats::Aggregate;
use crate::worker::partition::Partition;
use crate::worker::{Worker, WorkerOutcome};
use abort::{AbortReport, AbortSignal};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::unistd::{fork, ForkResult};
use reap::{WorkerExit, WorkerGroup};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

/// Default interval between non-blocking reap passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a run ended, when it did not fail
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// Every worker finished; the combined aggregate
    Completed(Aggregate),
    /// A worker classified an invalid URL; partial results were discarded
    Aborted(AbortReport),
}

/// Orchestrates one probe run
#[derive(Debug, Clone)]
pub struct Coordinator {
    worker_count: usize,
    channel: ChannelKind,
    poll_interval: Duration,
}

impl Coordinator {
    /// Create a coordinator for `worker_count` workers
    pub fn new(worker_count: usize, channel: ChannelKind) -> Result<Self> {
        if worker_count == 0 {
            return Err(PulseError::InvalidPartition {
                worker_id: 0,
                worker_count: 0,
            });
        }
        Ok(Self {
            worker_count,
            channel,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Ok(Self::new(config.workers, config.channel)?
            .with_poll_interval(Duration::from_millis(config.poll_interval_ms)))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    /// True when the run uses the inline, channel-free path
    pub fn is_serial(&self) -> bool {
        self.worker_count == 1
    }

    /// Run every worker over `source` and combine the results
    ///
    /// `make_classifier` is called once per worker, inside the worker's own
    /// process, so classifiers that own threads or runtimes are created after
    /// the fork.
    pub fn run<S, C, F>(&self, source: &S, make_classifier: F) -> Result<RunOutcome>
    where
        S: LineSource + ?Sized,
        C: Classifier,
        F: Fn() -> Result<C>,
    {
        source.check()?;

        tracing::info!(
            workers = self.worker_count,
            channel = %self.channel,
            input = %source.describe(),
            "starting run"
        );

        if self.is_serial() {
            return run_serial(source, &make_classifier);
        }
        self.run_parallel(source, &make_classifier)
    }

    fn run_parallel<S, C, F>(&self, source: &S, make_classifier: &F) -> Result<RunOutcome>
    where
        S: LineSource + ?Sized,
        C: Classifier,
        F: Fn() -> Result<C>,
    {
        // Shared state exists before any worker does
        let abort = AbortSignal::new()?;
        let mut channel = create_channel(self.channel, self.worker_count)?;
        let mut group = WorkerGroup::new();

        // Buffered output would otherwise be duplicated into every child
        let _ = std::io::stdout().flush();
        let _ = std::io::stderr().flush();

        for id in 0..self.worker_count {
            let partition = Partition::new(id, self.worker_count)?;

            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    let code = run_child(partition, source, make_classifier, channel.as_mut(), &abort);
                    let _ = std::io::stdout().flush();
                    std::process::exit(code);
                }
                Ok(ForkResult::Parent { child }) => {
                    tracing::debug!(worker = id, pid = child.as_raw(), "worker spawned");
                    group.push(id, child);
                    if let Err(e) = channel.worker_spawned(id) {
                        group.terminate_remaining();
                        return Err(e);
                    }
                }
                Err(e) => {
                    group.terminate_remaining();
                    return Err(PulseError::Spawn {
                        worker: id,
                        message: e.to_string(),
                    });
                }
            }
        }

        match self.reap(&mut group, &abort)? {
            Some(report) => {
                tracing::info!(%report, "run aborted on invalid URL");
                Ok(RunOutcome::Aborted(report))
            }
            None => {
                let total = channel.collect_final()?;
                tracing::info!(count = total.count, unknown = total.unknown, "run completed");
                Ok(RunOutcome::Completed(total))
            }
        }
    }

    /// Poll until every worker exited, the group aborted, or a worker failed
    ///
    /// Returns the abort report when the run aborted, `None` when every
    /// worker finished cleanly.
    fn reap(&self, group: &mut WorkerGroup, abort: &AbortSignal) -> Result<Option<AbortReport>> {
        loop {
            let reaped = group.poll();

            let aborted = abort.is_raised() || group.find(|e| *e == WorkerExit::Aborted).is_some();
            if aborted {
                group.terminate_remaining();
                let report = abort
                    .report()
                    .or_else(|| {
                        group
                            .find(|e| *e == WorkerExit::Aborted)
                            .map(|m| AbortReport { worker: m.id, line: 0 })
                    })
                    .ok_or_else(|| PulseError::Channel("abort raised without a report".to_string()))?;
                return Ok(Some(report));
            }

            if let Some(failed) = group.find(|e| !e.is_finished() && !e.is_abort_related()) {
                let worker = failed.id;
                let reason = failed.exit.map(|e| e.to_string()).unwrap_or_default();
                group.terminate_remaining();
                return Err(PulseError::WorkerFailed { worker, reason });
            }

            // Cancelled only makes sense once the signal is up, which was handled above
            if let Some(cancelled) = group.find(|e| *e == WorkerExit::Cancelled) {
                let worker = cancelled.id;
                group.terminate_remaining();
                return Err(PulseError::WorkerFailed {
                    worker,
                    reason: WorkerExit::Cancelled.to_string(),
                });
            }

            if group.all_exited() {
                return Ok(None);
            }

            if reaped == 0 {
                std::thread::sleep(self.poll_interval);
            }
        }
    }
}

/// No-parallelism path: one worker, inline, no channel
fn run_serial<S, C, F>(source: &S, make_classifier: &F) -> Result<RunOutcome>
where
    S: LineSource + ?Sized,
    C: Classifier,
    F: Fn() -> Result<C>,
{
    let mut classifier = make_classifier()?;
    let mut worker = Worker::new(Partition::single());

    match worker.run(source.lines()?, &mut classifier, None)? {
        WorkerOutcome::Finished(total) => Ok(RunOutcome::Completed(total)),
        WorkerOutcome::Aborted { line } => Ok(RunOutcome::Aborted(AbortReport { worker: 0, line })),
        WorkerOutcome::Cancelled { line } => Err(PulseError::WorkerFailed {
            worker: 0,
            reason: format!("was cancelled at line {} without a group abort", line + 1),
        }),
    }
}

/// Body of a forked worker; returns the process exit code
fn run_child<S, C, F>(
    partition: Partition,
    source: &S,
    make_classifier: &F,
    channel: &mut dyn AggregationChannel,
    abort: &AbortSignal,
) -> i32
where
    S: LineSource + ?Sized,
    C: Classifier,
    F: Fn() -> Result<C>,
{
    let id = partition.worker_id();

    // The coordinator's termination request must actually terminate us
    unsafe {
        let _ = signal::signal(Signal::SIGTERM, SigHandler::SigDfl);
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<i32> {
        channel.attach_worker(id)?;
        let mut classifier = make_classifier()?;
        let mut worker = Worker::new(partition);

        let code = match worker.run(source.lines()?, &mut classifier, Some(abort))? {
            WorkerOutcome::Finished(_) => {
                worker.hand_off(channel)?;
                reap::EXIT_FINISHED
            }
            WorkerOutcome::Aborted { .. } => reap::EXIT_ABORTED,
            WorkerOutcome::Cancelled { .. } => reap::EXIT_CANCELLED,
        };
        Ok(code)
    }));

    match result {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            tracing::error!(worker = id, error = %e, "worker failed");
            reap::EXIT_FAILED
        }
        Err(_) => reap::EXIT_PANICKED,
    }
}
