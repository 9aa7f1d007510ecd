//! Configuration validation

use super::*;
use anyhow::{Context, Result};

/// Upper bound on worker processes
pub const MAX_WORKERS: usize = 1024;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_run(&config.run)?;
    validate_probe(&config.probe)?;
    validate_output(&config.output)?;
    Ok(())
}

/// Validate run configuration
pub fn validate_run(run: &RunConfig) -> Result<()> {
    if run.input.is_none() {
        anyhow::bail!("no input file given (pass INPUT or set run.input in the config file)");
    }

    if run.workers == 0 || run.workers > MAX_WORKERS {
        anyhow::bail!("workers must be between 1 and {}, got {}", MAX_WORKERS, run.workers);
    }

    if run.poll_interval_ms == 0 || run.poll_interval_ms > 1000 {
        anyhow::bail!(
            "poll_interval_ms must be between 1 and 1000, got {}",
            run.poll_interval_ms
        );
    }

    Ok(())
}

/// Validate probe configuration
pub fn validate_probe(probe: &ProbeConfig) -> Result<()> {
    if probe.timeout_secs == 0 {
        anyhow::bail!("timeout_secs must be greater than 0");
    }

    if probe.scheme_prefix.trim().is_empty() {
        anyhow::bail!("scheme_prefix must not be empty");
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if let Some(path) = &output.json_output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            let meta = std::fs::metadata(parent)
                .with_context(|| format!("JSON output directory {} is not accessible", parent.display()))?;
            if !meta.is_dir() {
                anyhow::bail!("JSON output parent {} is not a directory", parent.display());
            }
        }
    }

    Ok(())
}
