//! JSON output
//!
//! Wraps a [`Report`] with a timestamp and writes it to stdout or a file.
//!
//! ```text
//! {"timestamp":"2024-01-01T00:00:00+00:00","status":"completed",
//!  "average_secs":0.25,"sites":4,"unknown":1,"workers":2,"channel":"point-to-point"}
//! ```

use super::Report;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Serialized form of a report
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub timestamp: String,
    #[serde(flatten)]
    pub report: &'a Report,
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a Report) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            report,
        }
    }
}

/// Render a report as a JSON string
pub fn render(report: &Report, pretty: bool) -> Result<String> {
    let json = JsonReport::new(report);
    let out = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    out.context("Failed to serialize report")
}

/// Write JSON output to a file, or stdout when `output_path` is `None`
pub fn write_json_output(output_path: Option<&Path>, report: &Report, pretty: bool) -> Result<()> {
    let json = render(report, pretty)?;

    match output_path {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            writeln!(file, "{}", json)?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            writeln!(lock, "{}", json)?;
        }
    }

    Ok(())
}
