//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert::{convert_channel_type, convert_output_format};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    // Run settings
    if let Some(input) = &cli.input {
        config.run.input = Some(input.clone());
    }
    if let Some(workers) = cli.workers {
        config.run.workers = workers;
    }
    if let Some(channel) = cli.channel_type() {
        config.run.channel = convert_channel_type(channel);
    }
    if let Some(interval) = cli.poll_interval_ms {
        config.run.poll_interval_ms = interval;
    }

    // Probe settings
    if let Some(timeout) = cli.timeout {
        config.probe.timeout_secs = timeout;
    }
    if let Some(prefix) = &cli.scheme_prefix {
        config.probe.scheme_prefix = prefix.clone();
    }
    if cli.no_follow_redirects {
        config.probe.follow_redirects = false;
    }

    // Output settings; a JSON file implies JSON output
    if let Some(format) = cli.format {
        config.output.format = convert_output_format(format);
    }
    if let Some(path) = &cli.json_output {
        config.output.json_output = Some(path.clone());
        config.output.format = OutputFormat::Json;
    }

    Ok(config)
}
