//! urlpulse CLI entry point

use anyhow::{Context, Result};
use std::process::ExitCode;
use urlpulse::config::{cli::Cli, cli_convert, toml, validator, Config, OutputFormat};
use urlpulse::coordinator::Coordinator;
use urlpulse::output::{json, text, Report};
use urlpulse::probe::http::HttpProbe;
use urlpulse::source::FileSource;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    urlpulse::logging::init(cli_convert::log_config(&cli));

    match run(&cli) {
        Ok(report) if report.is_aborted() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build configuration from the optional TOML file and the CLI
fn build_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => toml::parse_toml_file(path)?,
        None => Config::default(),
    };
    toml::merge_cli_with_config(cli, base)
}

fn run(cli: &Cli) -> Result<Report> {
    let config = build_config(cli)?;
    validator::validate_config(&config).context("Configuration validation failed")?;

    let input = config
        .run
        .input
        .clone()
        .context("no input file given")?;
    let source = FileSource::new(input);
    let coordinator = Coordinator::from_config(&config.run)?;

    let probe = config.probe.clone();
    let outcome = coordinator.run(&source, || HttpProbe::new(&probe))?;
    let report = Report::from_outcome(&outcome, coordinator.worker_count(), coordinator.channel());

    match config.output.format {
        OutputFormat::Text => text::print_report(&report),
        OutputFormat::Json => {
            let path = config.output.json_output.as_deref();
            json::write_json_output(path, &report, true)?;
            // JSON went to a file; stdout still gets the usual line
            if path.is_some() {
                text::print_report(&report);
            }
        }
    }

    Ok(report)
}
