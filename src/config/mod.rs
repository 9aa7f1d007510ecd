//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use crate::channel::ChannelKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to probe and how to split the work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// File with one URL per line
    #[serde(default)]
    pub input: Option<PathBuf>,
    /// Number of worker processes (1 = no parallelism)
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Aggregation channel used when workers > 1
    #[serde(default)]
    pub channel: ChannelKind,
    /// Interval between non-blocking reap passes
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_workers() -> usize {
    1
}

fn default_poll_interval_ms() -> u64 {
    10
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: None,
            workers: default_workers(),
            channel: ChannelKind::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// HTTP probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Follow HTTP redirects
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
    /// Lines not starting with this prefix are invalid
    #[serde(default = "default_scheme_prefix")]
    pub scheme_prefix: String,
}

fn default_timeout_secs() -> u64 {
    2
}

fn default_follow_redirects() -> bool {
    true
}

fn default_scheme_prefix() -> String {
    "http".to_string()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            follow_redirects: default_follow_redirects(),
            scheme_prefix: default_scheme_prefix(),
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write the JSON report here instead of stdout
    #[serde(default)]
    pub json_output: Option<PathBuf>,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.run.workers, 1);
        assert_eq!(config.run.channel, ChannelKind::SharedRegion);
        assert_eq!(config.run.poll_interval_ms, 10);
        assert_eq!(config.probe.timeout_secs, 2);
        assert!(config.probe.follow_redirects);
        assert_eq!(config.probe.scheme_prefix, "http");
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
