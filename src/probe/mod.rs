//! URL classification
//!
//! A [`Classifier`] maps one URL to a [`Classification`]. Workers drive a
//! classifier over the lines they own and never look inside it: timing,
//! transport and retry behaviour all belong to the implementation.
//!
//! # Implementations
//!
//! - **HttpProbe**: HEAD request over `reqwest`, timed end to end
//! - **ScriptedClassifier**: table-driven, for tests and dry runs
//!
//! # Example
//!
//! ```
//! use urlpulse::probe::{Classification, Classifier, mock::ScriptedClassifier};
//!
//! let mut classifier = ScriptedClassifier::new("http")
//!     .with("http://a.example", Classification::Latency(0.25));
//!
//! assert_eq!(classifier.classify("http://a.example"), Classification::Latency(0.25));
//! assert_eq!(classifier.classify("ftp://b.example"), Classification::Invalid);
//! ```

pub mod http;
pub mod mock;

use std::fmt;

/// Outcome of probing a single URL
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Probe succeeded; elapsed time in seconds
    Latency(f64),
    /// URL looked valid but could not be measured (timeout, transport error)
    Unknown,
    /// URL does not start with the recognised scheme prefix
    Invalid,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latency(secs) => write!(f, "latency {:.4}s", secs),
            Self::Unknown => write!(f, "unknown"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// Classifier trait for all probe backends
///
/// Called once per owned line, from inside a worker process. Implementations
/// may block; that is the dominant cost of a run.
pub trait Classifier {
    /// Classify one URL
    fn classify(&mut self, url: &str) -> Classification;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&mut self, url: &str) -> Classification {
        (**self).classify(url)
    }
}

/// True if `url` begins with `prefix`
///
/// An empty prefix accepts everything.
#[inline]
pub fn has_scheme_prefix(url: &str, prefix: &str) -> bool {
    url.starts_with(prefix)
}
