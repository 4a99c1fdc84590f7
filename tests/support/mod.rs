//! Fixtures shared by the integration tests.
//!
//! Every sink writes into its own temporary directory and is stamped by a
//! [`ManualClock`] so file names do not depend on when the tests run.

#![allow(dead_code)]

use std::{fs, path::Path};

use chrono::{DateTime, Local, NaiveDate};
use femtosink::{FemtoSink, ManualClock, SinkConfig};
use rstest::fixture;
use tempfile::TempDir;

pub fn local_time(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .and_then(|naive| naive.and_local_timezone(Local).single())
        .expect("unambiguous local time")
}

/// Clock parked at noon on 2024-06-01.
#[fixture]
pub fn clock() -> ManualClock {
    ManualClock::new(local_time(2024, 6, 1, 12, 0, 0))
}

#[fixture]
pub fn log_dir() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

pub fn open_sink(dir: &Path, config: SinkConfig, clock: &ManualClock) -> FemtoSink {
    let config = SinkConfig {
        directory: dir.to_path_buf(),
        ..config
    };
    FemtoSink::builder(config)
        .with_clock(clock.clone())
        .open()
        .expect("sink opens")
}

/// Contents of the log file for `file_name`, or an empty string if absent.
pub fn read_log(dir: &Path, file_name: &str) -> String {
    fs::read_to_string(dir.join(file_name)).unwrap_or_default()
}

pub fn log_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read log dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
