//! CLI argument parsing using clap

use crate::logging::LogFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Aggregation channel selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelType {
    /// One aggregate in shared memory guarded by a process-shared lock
    SharedRegion,
    /// One pipe per worker carrying a single record
    PointToPoint,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// urlpulse - parallel URL latency prober
#[derive(Parser, Debug)]
#[command(name = "urlpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// File with one URL per line
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Number of worker processes (1 = no parallelism)
    #[arg(value_name = "WORKERS")]
    pub workers: Option<usize>,

    /// Aggregation channel used when WORKERS > 1
    #[arg(short = 'c', long, value_enum)]
    pub channel: Option<ChannelType>,

    /// Shortcut for --channel point-to-point
    #[arg(short = 'f', long, conflicts_with = "channel")]
    pub pipe: bool,

    /// TOML configuration file (CLI arguments take precedence)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    // === Probe Options ===
    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Lines not starting with this prefix abort the run
    #[arg(long, value_name = "PREFIX")]
    pub scheme_prefix: Option<String>,

    /// Do not follow HTTP redirects
    #[arg(long)]
    pub no_follow_redirects: bool,

    // === Output Options ===
    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    // === Runtime Options ===
    /// Interval between worker reap passes in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log format: pretty, compact, json
    #[arg(long, default_value = "compact")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Channel requested on the command line, if any
    pub fn channel_type(&self) -> Option<ChannelType> {
        if self.pipe {
            Some(ChannelType::PointToPoint)
        } else {
            self.channel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["urlpulse", "urls.txt", "4"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("urls.txt")));
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.channel_type(), None);
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_pipe_shortcut() {
        let cli = Cli::try_parse_from(["urlpulse", "urls.txt", "2", "-f"]).unwrap();
        assert_eq!(cli.channel_type(), Some(ChannelType::PointToPoint));
    }

    #[test]
    fn test_channel_flag() {
        let cli = Cli::try_parse_from(["urlpulse", "urls.txt", "2", "--channel", "shared-region"]).unwrap();
        assert_eq!(cli.channel_type(), Some(ChannelType::SharedRegion));

        // -f and --channel are mutually exclusive
        assert!(Cli::try_parse_from(["urlpulse", "u", "2", "-f", "-c", "shared-region"]).is_err());
    }

    #[test]
    fn test_rejects_non_numeric_workers() {
        assert!(Cli::try_parse_from(["urlpulse", "urls.txt", "many"]).is_err());
    }
}
