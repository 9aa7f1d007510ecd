//! Human-readable text output

use super::Report;

/// Diagnostic printed instead of a report when the run aborted
pub const ABORT_MESSAGE: &str = "Illegal url detected, exiting now";

/// Render a report as its single output line
pub fn render(report: &Report) -> String {
    match report {
        Report::Completed { average_secs: Some(avg), sites, unknown, .. } => {
            format!("{:.4} Average response time from {} sites, {} Unknown", avg, sites, unknown)
        }
        Report::Completed { average_secs: None, unknown, .. } => {
            format!("No Average response time from 0 sites, {} Unknown", unknown)
        }
        Report::Aborted { .. } => ABORT_MESSAGE.to_string(),
    }
}

/// Print a report to stdout
pub fn print_report(report: &Report) {
    println!("{}", render(report));
}
