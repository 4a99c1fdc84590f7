//! Shared helpers for unit tests.
//!
//! Provides a capturing logger so tests can assert diagnostics without
//! conflicting with the global logger state, plus an in-memory file opener
//! whose writes can be scripted to fail or stall.

use std::{
    collections::{BTreeMap, VecDeque},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, Once, OnceLock},
    thread,
    time::Duration,
};

use chrono::{DateTime, Local, NaiveDate};
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::{
    formatter::{DefaultFormatter, FemtoFormatter},
    log_event::FemtoLogEvent,
    rotation::LogFileOpener,
};

#[derive(Clone, Debug)]
pub(crate) struct CapturedLog {
    pub level: Level,
    pub target: String,
    pub message: String,
}

struct TestLogger;

static LOGGER: TestLogger = TestLogger;
static INIT: Once = Once::new();
static LOGS: OnceLock<Mutex<Vec<CapturedLog>>> = OnceLock::new();

impl Log for TestLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let logs = LOGS.get_or_init(|| Mutex::new(Vec::new()));
        let mut guard = logs.lock().expect("logger mutex poisoned");
        guard.push(CapturedLog {
            level: record.level(),
            target: record.target().to_owned(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {}
}

pub(crate) fn install_test_logger() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).expect("set test logger");
        log::set_max_level(LevelFilter::Trace);
    });
    clear_logs();
}

pub(crate) fn take_logged_messages() -> Vec<CapturedLog> {
    let logs = LOGS.get_or_init(|| Mutex::new(Vec::new()));
    let mut guard = logs.lock().expect("logger mutex poisoned");
    guard.drain(..).collect()
}

pub(crate) fn clear_logs() {
    if let Some(logs) = LOGS.get() {
        logs.lock().expect("logger mutex poisoned").clear();
    }
}

/// Local timestamp on `date` at `h:m:s`.
pub(crate) fn local_time(date: NaiveDate, h: u32, m: u32, s: u32) -> DateTime<Local> {
    date.and_hms_opt(h, m, s)
        .and_then(|dt| dt.and_local_timezone(Local).single())
        .expect("unambiguous local time")
}

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// In-memory stand-in for the log directory.
#[derive(Clone, Default)]
pub(crate) struct MemoryFiles {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
    opens: Arc<Mutex<usize>>,
    failures: Arc<Mutex<VecDeque<io::ErrorKind>>>,
}

impl MemoryFiles {
    /// Make the next `count` writes fail with `kind`.
    pub(crate) fn fail_next(&self, count: usize, kind: io::ErrorKind) {
        let mut failures = self.failures.lock().expect("failures lock");
        failures.extend(std::iter::repeat_n(kind, count));
    }

    pub(crate) fn contents(&self, file_name: &str) -> String {
        let files = self.files.lock().expect("files lock");
        files
            .iter()
            .find(|(path, _)| path.file_name().is_some_and(|n| n == file_name))
            .map(|(_, bytes)| String::from_utf8(bytes.clone()).expect("invalid UTF-8"))
            .unwrap_or_default()
    }

    pub(crate) fn file_names(&self) -> Vec<String> {
        let files = self.files.lock().expect("files lock");
        files
            .keys()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    pub(crate) fn open_count(&self) -> usize {
        *self.opens.lock().expect("opens lock")
    }

    pub(crate) fn opener(&self) -> MemoryOpener {
        MemoryOpener {
            files: self.clone(),
            write_delay: Duration::ZERO,
        }
    }

    /// Opener whose every write sleeps for `delay` first.
    pub(crate) fn slow_opener(&self, delay: Duration) -> MemoryOpener {
        MemoryOpener {
            files: self.clone(),
            write_delay: delay,
        }
    }
}

pub(crate) struct MemoryOpener {
    files: MemoryFiles,
    write_delay: Duration,
}

impl LogFileOpener for MemoryOpener {
    type Writer = MemoryWriter;

    fn open(&mut self, path: &Path) -> io::Result<MemoryWriter> {
        *self.files.opens.lock().expect("opens lock") += 1;
        self.files
            .files
            .lock()
            .expect("files lock")
            .entry(path.to_path_buf())
            .or_default();
        Ok(MemoryWriter {
            path: path.to_path_buf(),
            files: self.files.clone(),
            write_delay: self.write_delay,
        })
    }
}

pub(crate) struct MemoryWriter {
    path: PathBuf,
    files: MemoryFiles,
    write_delay: Duration,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.write_delay.is_zero() {
            thread::sleep(self.write_delay);
        }
        if let Some(kind) = self.files.failures.lock().expect("failures lock").pop_front() {
            return Err(io::Error::new(kind, "scripted write failure"));
        }
        self.files
            .files
            .lock()
            .expect("files lock")
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Formatter that panics for messages equal to `"boom"`.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PanickingFormatter;

impl FemtoFormatter for PanickingFormatter {
    fn format(&self, event: &FemtoLogEvent) -> String {
        if event.message() == "boom" {
            panic!("formatter exploded");
        }
        DefaultFormatter.format(event)
    }
}
