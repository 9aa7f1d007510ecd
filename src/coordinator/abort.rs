//! Group abort signal
//!
//! A one-shot, run-wide flag in shared memory. The first worker that sees an
//! invalid URL raises it; every other worker checks it before each owned line
//! and the coordinator checks it while reaping. Raising is a single
//! compare-and-swap that also records who tripped it, so the report is
//! complete even if the raiser is terminated right afterwards.

use crate::error::Result;
use crate::util::shm::SharedRegion;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const LINE_BITS: u32 = 48;
const LINE_MASK: u64 = (1 << LINE_BITS) - 1;
const MAX_WORKER: usize = (1 << (64 - LINE_BITS)) - 2;

/// Which worker aborted the run, and on which input line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AbortReport {
    pub worker: usize,
    /// Zero-based line index
    pub line: u64,
}

impl fmt::Display for AbortReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {} at line {}", self.worker, self.line + 1)
    }
}

/// Run-wide abort flag shared by the coordinator and all workers
pub struct AbortSignal {
    state: SharedRegion<AtomicU64>,
}

impl AbortSignal {
    /// Create a cleared signal; must happen before any worker is forked
    pub fn new() -> Result<Self> {
        Ok(Self {
            state: SharedRegion::new(AtomicU64::new(0))?,
        })
    }

    /// Raise the signal
    ///
    /// Returns `true` for the caller that actually tripped it; later callers
    /// get `false` and the first report is kept.
    pub fn raise(&self, worker: usize, line: u64) -> bool {
        let encoded = encode(worker, line);
        self.state
            .compare_exchange(0, encoded, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_raised(&self) -> bool {
        self.state.load(Ordering::Acquire) != 0
    }

    /// Who raised the signal, if anyone
    pub fn report(&self) -> Option<AbortReport> {
        decode(self.state.load(Ordering::Acquire))
    }
}

fn encode(worker: usize, line: u64) -> u64 {
    let worker = worker.min(MAX_WORKER) as u64 + 1;
    (worker << LINE_BITS) | (line & LINE_MASK)
}

fn decode(value: u64) -> Option<AbortReport> {
    if value == 0 {
        return None;
    }
    Some(AbortReport {
        worker: ((value >> LINE_BITS) - 1) as usize,
        line: value & LINE_MASK,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        for (worker, line) in [(0, 0), (3, 17), (1023, 123_456_789)] {
            let report = decode(encode(worker, line)).unwrap();
            assert_eq!(report, AbortReport { worker, line });
        }
        assert_eq!(decode(0), None);
    }

    #[test]
    fn test_first_raiser_wins() {
        let signal = AbortSignal::new().unwrap();
        assert!(!signal.is_raised());
        assert_eq!(signal.report(), None);

        assert!(signal.raise(2, 5));
        assert!(!signal.raise(0, 1));

        assert!(signal.is_raised());
        assert_eq!(signal.report(), Some(AbortReport { worker: 2, line: 5 }));
    }

    #[test]
    fn test_report_display_is_one_based() {
        let report = AbortReport { worker: 1, line: 0 };
        assert_eq!(report.to_string(), "worker 1 at line 1");
    }
}
