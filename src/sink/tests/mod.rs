//! Unit tests for the sink front end.
//!
//! Files live in memory so tests can inspect exactly what reached "disk" and
//! slow writes down to provoke overflow and forced cancellation.

use std::time::Duration;

use chrono::{DateTime, Local};

use super::*;
use crate::clock::ManualClock;
use crate::test_support::{MemoryFiles, date, local_time};


fn start() -> DateTime<Local> {
    local_time(date(2024, 6, 1), 12, 0, 0)
}

fn memory_sink(files: &MemoryFiles, config: SinkConfig) -> FemtoSink {
    SinkBuilder::new(config)
        .with_opener(files.opener())
        .with_clock(ManualClock::new(start()))
        .open()
        .expect("sink opens")
}

fn slow_sink(files: &MemoryFiles, config: SinkConfig, delay: Duration) -> FemtoSink {
    SinkBuilder::new(config)
        .with_opener(files.slow_opener(delay))
        .with_clock(ManualClock::new(start()))
        .open()
        .expect("sink opens")
}

#[test]
fn records_are_written_in_emission_order() {
    let files = MemoryFiles::default();
    let sink = memory_sink(&files, SinkConfig::default());
    for i in 0..5 {
        sink.emit(FemtoLevel::Information, "core", &format!("m{i}"), None);
    }
    sink.close();

    let expected: String = (0..5)
        .map(|i| format!("12:00:00.000 [Information] m{i}\n"))
        .collect();
    assert_eq!(files.contents("log-20240601.txt"), expected);
    assert_eq!(sink.stats().written, 5);
}

#[test]
fn levels_below_minimum_are_not_queued() {
    let files = MemoryFiles::default();
    let sink = memory_sink(
        &files,
        SinkConfig::default().with_min_level(FemtoLevel::Warning),
    );
    assert!(!sink.is_enabled(FemtoLevel::Information));
    assert!(sink.is_enabled(FemtoLevel::Warning));
    assert!(sink.is_enabled(FemtoLevel::Critical));
    assert!(!sink.is_enabled(FemtoLevel::None));
    assert_eq!(
        sink.try_emit(FemtoLevel::Debug, "core", "quiet", None),
        Err(EmitError::Disabled)
    );
    sink.close();
    assert!(files.file_names().is_empty());
    assert_eq!(sink.stats(), SinkStats::default());
}

#[test]
fn level_none_is_never_written() {
    let files = MemoryFiles::default();
    let sink = memory_sink(&files, SinkConfig::default().with_min_level(FemtoLevel::Trace));
    sink.emit(FemtoLevel::None, "core", "never", None);
    sink.close();
    assert!(files.file_names().is_empty());
}

#[test]
fn disabled_configuration_accepts_nothing() {
    let files = MemoryFiles::default();
    let config = SinkConfig {
        enabled: false,
        ..SinkConfig::default()
    };
    let sink = memory_sink(&files, config);
    for level in FemtoLevel::ALL {
        assert!(!sink.is_enabled(level));
    }
    sink.emit(FemtoLevel::Critical, "core", "ignored", None);
    sink.close();
    assert!(files.file_names().is_empty());
    assert_eq!(files.open_count(), 0);
}

#[test]
fn error_details_follow_the_message() {
    let files = MemoryFiles::default();
    let sink = memory_sink(&files, SinkConfig::default());
    sink.emit(
        FemtoLevel::Error,
        "db",
        "query failed",
        Some(ErrorDetail::new("connection reset", "at pool.rs:42")),
    );
    sink.close();
    assert_eq!(
        files.contents("log-20240601.txt"),
        "12:00:00.000 [      Error] query failed\nconnection reset\nat pool.rs:42\n"
    );
}

#[test]
fn clock_crossing_midnight_switches_files() {
    let files = MemoryFiles::default();
    let clock = ManualClock::new(local_time(date(2024, 6, 1), 23, 59, 59));
    let sink = SinkBuilder::new(SinkConfig::default())
        .with_opener(files.opener())
        .with_clock(clock.clone())
        .open()
        .expect("sink opens");

    sink.emit(FemtoLevel::Information, "core", "late", None);
    clock.advance(chrono::TimeDelta::seconds(2));
    sink.emit(FemtoLevel::Information, "core", "early", None);
    sink.close();

    assert_eq!(
        files.file_names(),
        vec!["log-20240601.txt".to_owned(), "log-20240602.txt".to_owned()]
    );
    assert_eq!(
        files.contents("log-20240601.txt"),
        "23:59:59.000 [Information] late\n"
    );
    assert_eq!(
        files.contents("log-20240602.txt"),
        "00:00:01.000 [Information] early\n"
    );
}

#[test]
fn submitted_events_keep_their_own_timestamp() {
    let files = MemoryFiles::default();
    let sink = memory_sink(&files, SinkConfig::default());
    let stamped = local_time(date(2023, 12, 31), 8, 30, 0);
    sink.submit(FemtoLogEvent::at(
        stamped,
        FemtoLevel::Warning,
        "import",
        "backfilled",
    ))
    .expect("queued");
    sink.close();
    assert_eq!(
        files.contents("log-20231231.txt"),
        "08:30:00.000 [    Warning] backfilled\n"
    );
}
