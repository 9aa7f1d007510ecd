//! CLI to Config conversion utilities

use crate::channel::ChannelKind;
use crate::config::{cli, OutputFormat};
use crate::logging::LogConfig;
use tracing::Level;

/// Convert CLI ChannelType to ChannelKind
pub fn convert_channel_type(cli_type: cli::ChannelType) -> ChannelKind {
    match cli_type {
        cli::ChannelType::SharedRegion => ChannelKind::SharedRegion,
        cli::ChannelType::PointToPoint => ChannelKind::PointToPoint,
    }
}

/// Convert CLI OutputFormat to config OutputFormat
pub fn convert_output_format(cli_format: cli::OutputFormat) -> OutputFormat {
    match cli_format {
        cli::OutputFormat::Text => OutputFormat::Text,
        cli::OutputFormat::Json => OutputFormat::Json,
    }
}

/// Logging configuration implied by the CLI flags
pub fn log_config(cli: &cli::Cli) -> LogConfig {
    let level = if cli.debug { Level::DEBUG } else { Level::WARN };
    let mut config = LogConfig::default().with_level(level).with_format(cli.log_format);
    if cli.debug {
        // --debug beats whatever RUST_LOG says
        config = config.with_filter("debug".to_string());
    }
    config.with_env_overrides()
}
