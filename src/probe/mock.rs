//! Scripted classifier for testing
//!
//! Returns fixed results from a URL table without touching the network, which
//! makes worker and coordinator runs fast and deterministic.
//!
//! URLs missing from the table fall back to the scheme rule: no prefix means
//! `Invalid`, anything else is `Unknown`.
//!
//! # Example
//!
//! ```
//! use urlpulse::probe::{Classification, Classifier, mock::ScriptedClassifier};
//!
//! let mut classifier = ScriptedClassifier::new("http")
//!     .with("http://slow.example", Classification::Latency(1.5));
//!
//! assert_eq!(classifier.classify("http://slow.example"), Classification::Latency(1.5));
//! assert_eq!(classifier.classify("http://other.example"), Classification::Unknown);
//! assert_eq!(classifier.calls(), 2);
//! ```

use super::{has_scheme_prefix, Classification, Classifier};
use std::collections::HashMap;

/// Table-driven classifier
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    scheme_prefix: String,
    table: HashMap<String, Classification>,
    calls: usize,
    seen: Vec<String>,
}

impl ScriptedClassifier {
    /// Create a classifier with an empty table
    pub fn new(scheme_prefix: impl Into<String>) -> Self {
        Self {
            scheme_prefix: scheme_prefix.into(),
            table: HashMap::new(),
            calls: 0,
            seen: Vec::new(),
        }
    }

    /// Add a fixed result for one URL
    pub fn with(mut self, url: impl Into<String>, result: Classification) -> Self {
        self.table.insert(url.into(), result);
        self
    }

    /// Build a classifier and matching input lines from a result list
    ///
    /// Line `i` becomes `http://site-{i}.test/` (or `invalid-{i}` for an
    /// `Invalid` entry) so every line is unique.
    pub fn from_results(results: &[Classification]) -> (Self, Vec<String>) {
        let mut classifier = Self::new("http");
        let mut lines = Vec::with_capacity(results.len());

        for (i, result) in results.iter().enumerate() {
            let url = match result {
                Classification::Invalid => format!("invalid-{}", i),
                _ => format!("http://site-{}.test/", i),
            };
            classifier.table.insert(url.clone(), *result);
            lines.push(url);
        }

        (classifier, lines)
    }

    /// Number of classify calls so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// URLs classified so far, in call order
    pub fn seen(&self) -> &[String] {
        &self.seen
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&mut self, url: &str) -> Classification {
        self.calls += 1;
        self.seen.push(url.to_string());

        if let Some(result) = self.table.get(url) {
            return *result;
        }
        if has_scheme_prefix(url, &self.scheme_prefix) {
            Classification::Unknown
        } else {
            Classification::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup() {
        let mut c = ScriptedClassifier::new("http")
            .with("http://a", Classification::Latency(0.1))
            .with("nope", Classification::Unknown);

        assert_eq!(c.classify("http://a"), Classification::Latency(0.1));
        // Table entries win over the scheme rule
        assert_eq!(c.classify("nope"), Classification::Unknown);
        assert_eq!(c.classify("ftp://b"), Classification::Invalid);
        assert_eq!(c.calls(), 3);
        assert_eq!(c.seen(), &["http://a", "nope", "ftp://b"]);
    }

    #[test]
    fn test_from_results() {
        let (mut c, lines) = ScriptedClassifier::from_results(&[
            Classification::Latency(0.2),
            Classification::Invalid,
            Classification::Unknown,
        ]);

        assert_eq!(lines.len(), 3);
        assert_eq!(c.classify(&lines[0]), Classification::Latency(0.2));
        assert_eq!(c.classify(&lines[1]), Classification::Invalid);
        assert_eq!(c.classify(&lines[2]), Classification::Unknown);
    }
}
