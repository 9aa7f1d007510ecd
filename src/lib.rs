//! urlpulse - parallel URL latency prober
//!
//! urlpulse reads a list of URLs, probes each one, and reports the mean
//! response time. The work can be split across forked worker processes that
//! hand their partial results back through one of two aggregation channels.
//!
//! # Architecture
//!
//! - **Partitioning**: line `i` belongs to worker `i mod N`
//! - **Workers**: classify their lines into latency, unknown, or invalid
//! - **Channels**: a mutex-guarded shared region or one pipe per worker
//! - **Fail-fast**: one invalid URL aborts the whole group, no partial report
//!
//! # Example
//!
//! ```
//! use urlpulse::channel::ChannelKind;
//! use urlpulse::coordinator::{Coordinator, RunOutcome};
//! use urlpulse::probe::{mock::ScriptedClassifier, Classification};
//! use urlpulse::source::MemorySource;
//!
//! let classifier = ScriptedClassifier::new("http")
//!     .with("http://a.test", Classification::Latency(0.2))
//!     .with("http://b.test", Classification::Latency(0.4));
//! let source = MemorySource::new(["http://a.test", "http://b.test"]);
//!
//! let outcome = Coordinator::new(1, ChannelKind::SharedRegion)?
//!     .run(&source, || Ok(classifier.clone()))?;
//! match outcome {
//!     RunOutcome::Completed(total) => assert_eq!(total.count, 2),
//!     RunOutcome::Aborted(_) => unreachable!(),
//! }
//! # Ok::<(), urlpulse::error::PulseError>(())
//! ```

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod output;
pub mod probe;
pub mod source;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use channel::ChannelKind;
pub use config::Config;
pub use coordinator::{Coordinator, RunOutcome};
pub use error::PulseError;
pub use stats::Aggregate;

/// Result type used by the binary and the configuration layer
pub type Result<T> = anyhow::Result<T>;
