//! Worker exit statuses and reaping
//!
//! Workers report their terminal state through the process exit status. The
//! coordinator polls each worker PID with `WNOHANG` rather than `wait(-1)`, so
//! it never reaps a child it did not fork.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::fmt;

/// Worker finished and handed off its aggregate
pub const EXIT_FINISHED: i32 = 0;
/// Worker hit a setup, input or channel error
pub const EXIT_FAILED: i32 = 2;
/// Worker classified an invalid URL and raised the group abort
pub const EXIT_ABORTED: i32 = 3;
/// Worker stopped because a sibling raised the group abort
pub const EXIT_CANCELLED: i32 = 4;
/// Worker panicked
pub const EXIT_PANICKED: i32 = 101;

/// How a worker process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Finished,
    Aborted,
    Cancelled,
    Failed(i32),
    Panicked,
    Signaled(Signal),
    Unknown,
}

impl WorkerExit {
    /// Clean completion with a delivered aggregate
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Part of the group-abort path rather than a failure
    pub fn is_abort_related(&self) -> bool {
        matches!(self, Self::Aborted | Self::Cancelled)
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::Aborted => write!(f, "aborted on an invalid URL"),
            Self::Cancelled => write!(f, "was cancelled without a group abort"),
            Self::Failed(code) => write!(f, "failed with exit code {}", code),
            Self::Panicked => write!(f, "panicked"),
            Self::Signaled(sig) => write!(f, "was killed by signal {:?}", sig),
            Self::Unknown => write!(f, "exited for an unknown reason"),
        }
    }
}

/// Map a `WaitStatus` to a worker exit; `None` while still running
pub fn analyze_wait_status(status: WaitStatus) -> Option<WorkerExit> {
    match status {
        WaitStatus::StillAlive => None,
        WaitStatus::Exited(_, EXIT_FINISHED) => Some(WorkerExit::Finished),
        WaitStatus::Exited(_, EXIT_ABORTED) => Some(WorkerExit::Aborted),
        WaitStatus::Exited(_, EXIT_CANCELLED) => Some(WorkerExit::Cancelled),
        WaitStatus::Exited(_, EXIT_PANICKED) => Some(WorkerExit::Panicked),
        WaitStatus::Exited(_, code) => Some(WorkerExit::Failed(code)),
        WaitStatus::Signaled(_, sig, _) => Some(WorkerExit::Signaled(sig)),
        // Stopped/continued are not terminal
        WaitStatus::Stopped(..) | WaitStatus::Continued(_) => None,
        #[allow(unreachable_patterns)]
        _ => Some(WorkerExit::Unknown),
    }
}

/// A forked worker and, once reaped, how it ended
#[derive(Debug)]
pub struct WorkerProcess {
    pub id: usize,
    pub pid: Pid,
    pub exit: Option<WorkerExit>,
}

/// The set of workers forked for one run
#[derive(Debug, Default)]
pub struct WorkerGroup {
    members: Vec<WorkerProcess>,
}

impl WorkerGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: usize, pid: Pid) {
        self.members.push(WorkerProcess { id, pid, exit: None });
    }

    /// True once every member has been reaped
    pub fn all_exited(&self) -> bool {
        self.members.iter().all(|m| m.exit.is_some())
    }

    /// Reap every member that has exited, without blocking
    ///
    /// Returns the number of members reaped by this call.
    pub fn poll(&mut self) -> usize {
        let mut reaped = 0;
        for member in self.members.iter_mut().filter(|m| m.exit.is_none()) {
            match waitpid(member.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(status) => {
                    if let Some(exit) = analyze_wait_status(status) {
                        tracing::debug!(worker = member.id, pid = member.pid.as_raw(), %exit, "worker exited");
                        member.exit = Some(exit);
                        reaped += 1;
                    }
                }
                Err(Errno::EINTR) => {}
                Err(e) => {
                    // ECHILD: someone else reaped it; we cannot know how it ended
                    tracing::warn!(worker = member.id, error = %e, "waitpid failed");
                    member.exit = Some(WorkerExit::Unknown);
                    reaped += 1;
                }
            }
        }
        reaped
    }

    /// First member that exited the given way
    pub fn find(&self, pred: impl Fn(&WorkerExit) -> bool) -> Option<&WorkerProcess> {
        self.members
            .iter()
            .find(|m| m.exit.as_ref().is_some_and(&pred))
    }

    /// Ask every running member to stop, then reap it
    ///
    /// Returns how many members had to be terminated.
    pub fn terminate_remaining(&mut self) -> usize {
        let running: Vec<usize> = self
            .members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.exit.is_none())
            .map(|(i, _)| i)
            .collect();

        for &i in &running {
            let member = &self.members[i];
            match signal::kill(member.pid, Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => tracing::warn!(worker = member.id, error = %e, "failed to signal worker"),
            }
        }

        for &i in &running {
            let member = &mut self.members[i];
            let exit = loop {
                match waitpid(member.pid, None) {
                    Ok(status) => {
                        if let Some(exit) = analyze_wait_status(status) {
                            break exit;
                        }
                    }
                    Err(Errno::EINTR) => continue,
                    Err(_) => break WorkerExit::Unknown,
                }
            };
            member.exit = Some(exit);
        }

        if !running.is_empty() {
            tracing::info!(terminated = running.len(), "terminated remaining workers");
        }
        running.len()
    }
}
