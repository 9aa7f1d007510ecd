//! Integration tests for urlpulse
//!
//! These fork real worker processes and drive them with scripted
//! classifiers, so no network access is needed.

use std::io::Write;
use std::process::Command;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use urlpulse::channel::ChannelKind;
use urlpulse::coordinator::abort::AbortReport;
use urlpulse::coordinator::{Coordinator, RunOutcome};
use urlpulse::error::PulseError;
use urlpulse::probe::mock::ScriptedClassifier;
use urlpulse::probe::{Classification, Classification::*, Classifier};
use urlpulse::source::{FileSource, LineSource, MemorySource};
use urlpulse::stats::Aggregate;

const CHANNELS: [ChannelKind; 2] = [ChannelKind::SharedRegion, ChannelKind::PointToPoint];

fn coordinator(workers: usize, channel: ChannelKind) -> Coordinator {
    Coordinator::new(workers, channel)
        .unwrap()
        .with_poll_interval(Duration::from_millis(1))
}

fn run_scripted(results: &[Classification], workers: usize, channel: ChannelKind) -> RunOutcome {
    let (classifier, lines) = ScriptedClassifier::from_results(results);
    let source = MemorySource::new(lines);
    coordinator(workers, channel)
        .run(&source, || Ok(classifier.clone()))
        .unwrap()
}

fn completed(outcome: RunOutcome) -> Aggregate {
    match outcome {
        RunOutcome::Completed(total) => total,
        RunOutcome::Aborted(report) => panic!("unexpected abort: {}", report),
    }
}

/// Sleeps before every probe and rejects lines starting with "bad"
struct SlowClassifier {
    delay: Duration,
}

impl Classifier for SlowClassifier {
    fn classify(&mut self, url: &str) -> Classification {
        if url.starts_with("bad") {
            return Invalid;
        }
        std::thread::sleep(self.delay);
        Latency(0.01)
    }
}

struct PanickingClassifier;

impl Classifier for PanickingClassifier {
    fn classify(&mut self, _url: &str) -> Classification {
        panic!("probe exploded");
    }
}

#[test]
fn test_four_latencies_two_workers_both_channels() {
    for channel in CHANNELS {
        let total = completed(run_scripted(
            &[Latency(0.1), Latency(0.2), Latency(0.3), Latency(0.4)],
            2,
            channel,
        ));
        assert_eq!(total.count, 4, "{}", channel);
        assert_eq!(total.unknown, 0, "{}", channel);
        assert!((total.average().unwrap() - 0.25).abs() < 1e-9, "{}", channel);
    }
}

#[test]
fn test_unknowns_counted_apart_from_latencies() {
    for channel in CHANNELS {
        let total = completed(run_scripted(&[Unknown, Latency(0.5), Unknown], 3, channel));
        assert_eq!(total.count, 1);
        assert_eq!(total.unknown, 2);
        assert_eq!(total.average(), Some(0.5));
    }
}

#[test]
fn test_invalid_url_aborts_and_discards_partials() {
    for channel in CHANNELS {
        for workers in [2, 3, 4] {
            let outcome = run_scripted(&[Latency(0.1), Invalid], workers, channel);
            // Line 1 is owned by worker 1 for every worker count above one
            assert_eq!(
                outcome,
                RunOutcome::Aborted(AbortReport { worker: 1, line: 1 }),
                "{} with {} workers",
                channel,
                workers
            );
        }
    }
}

#[test]
fn test_serial_matches_every_parallel_split() {
    let results: Vec<Classification> = (0..17)
        .map(|i| if i % 5 == 0 { Unknown } else { Latency(i as f64 * 0.125) })
        .collect();

    let serial = completed(run_scripted(&results, 1, ChannelKind::PointToPoint));
    assert!(coordinator(1, ChannelKind::PointToPoint).is_serial());

    // Eighths sum exactly in any order, so the aggregates must be identical
    for channel in CHANNELS {
        for workers in 2..=5 {
            let total = completed(run_scripted(&results, workers, channel));
            assert_eq!(total, serial, "{} with {} workers", channel, workers);
        }
    }
}

#[test]
fn test_empty_input_reports_no_data() {
    for channel in CHANNELS {
        for workers in [1, 3] {
            let total = completed(run_scripted(&[], workers, channel));
            assert!(total.is_empty());
            assert_eq!(total.average(), None);
        }
    }
}

#[test]
fn test_more_workers_than_lines() {
    for channel in CHANNELS {
        let total = completed(run_scripted(&[Latency(0.5), Unknown], 6, channel));
        assert_eq!(total.count, 1);
        assert_eq!(total.unknown, 1);
    }
}

#[test]
fn test_file_source_with_crlf() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "http://a.test\r\nhttp://b.test\r\nhttp://c.test\n").unwrap();
    file.flush().unwrap();

    let classifier = ScriptedClassifier::new("http")
        .with("http://a.test", Latency(0.25))
        .with("http://b.test", Latency(0.75));
    let source = FileSource::new(file.path());

    for channel in CHANNELS {
        let total = completed(
            coordinator(2, channel)
                .run(&source, || Ok(classifier.clone()))
                .unwrap(),
        );
        assert_eq!(total.count, 2);
        // c.test is not in the table and falls back to Unknown
        assert_eq!(total.unknown, 1);
        assert_eq!(total.average(), Some(0.5));
    }
}

#[test]
fn test_non_utf8_line_does_not_fail_the_run() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"http://b.test\nhttp://caf\xe9.test/\nhttp://c.test\n").unwrap();
    file.flush().unwrap();

    let classifier = ScriptedClassifier::new("http").with("http://b.test", Latency(0.5));
    let source = FileSource::new(file.path());

    for channel in CHANNELS {
        for workers in [1, 2] {
            let total = completed(
                coordinator(workers, channel)
                    .run(&source, || Ok(classifier.clone()))
                    .unwrap(),
            );
            // The undecodable line still has the scheme prefix and counts as Unknown
            assert_eq!(total.count, 1, "{} with {} workers", channel, workers);
            assert_eq!(total.unknown, 2, "{} with {} workers", channel, workers);
            assert_eq!(total.average(), Some(0.5));
        }
    }
}

#[test]
fn test_missing_input_is_error_before_spawn() {
    let source = FileSource::new("/nonexistent/urlpulse-input.txt");
    assert!(source.check().is_err());

    for channel in CHANNELS {
        let err = coordinator(4, channel)
            .run(&source, || Ok(ScriptedClassifier::new("http")))
            .unwrap_err();
        assert!(matches!(err, PulseError::Input(_)));
    }
}

#[test]
fn test_abort_terminates_slow_siblings() {
    // Worker 0 hits the invalid line first; worker 1 alone would need ~10s
    let mut lines = vec!["bad-url".to_string()];
    lines.extend((1..200).map(|i| format!("http://slow-{}.test/", i)));
    let source = MemorySource::new(lines);

    for channel in CHANNELS {
        let start = Instant::now();
        let outcome = coordinator(2, channel)
            .run(&source, || {
                Ok(SlowClassifier {
                    delay: Duration::from_millis(100),
                })
            })
            .unwrap();

        assert_eq!(outcome, RunOutcome::Aborted(AbortReport { worker: 0, line: 0 }));
        assert!(start.elapsed() < Duration::from_secs(5), "siblings were not stopped");
    }
}

#[test]
fn test_panicking_worker_is_failure() {
    let source = MemorySource::new(["http://a.test", "http://b.test"]);

    for channel in CHANNELS {
        let err = coordinator(2, channel)
            .run(&source, || Ok(PanickingClassifier))
            .unwrap_err();
        assert!(matches!(err, PulseError::WorkerFailed { .. }), "{:?}", err);
    }
}

#[test]
fn test_binary_reports_no_data_for_empty_file() {
    let file = NamedTempFile::new().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_urlpulse"))
        .arg(file.path())
        .arg("3")
        .arg("-f")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "No Average response time from 0 sites, 0 Unknown"
    );
}

#[test]
fn test_binary_aborts_on_invalid_url() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "ftp://example.com/").unwrap();
    writeln!(file, "gopher://example.com/").unwrap();
    file.flush().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_urlpulse"))
        .arg(file.path())
        .arg("2")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Exactly one diagnostic and no numeric report
    assert_eq!(stdout.matches("Illegal url detected, exiting now").count(), 1);
    assert!(!stdout.contains("Average"));
}

#[test]
fn test_binary_missing_input_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_urlpulse"))
        .arg("/nonexistent/urlpulse-input.txt")
        .arg("2")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
    assert!(output.stdout.is_empty());
}
