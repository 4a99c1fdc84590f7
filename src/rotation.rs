//! Date-based file rotation.
//!
//! [`DailyRotation`] owns the single open log file of a sink. It is only ever
//! touched by the worker thread, so it needs no locking. Rotation is checked
//! lazily for each record against the record's own date; nothing rotates on a
//! timer.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use log::warn;

use crate::diagnostics::DIAGNOSTIC_TARGET;

/// Opens the file backing a given path.
///
/// The production implementation is [`FsOpener`]; tests substitute writers
/// that fail on demand.
pub trait LogFileOpener: Send {
    type Writer: Write + Send;

    /// Called once when the sink is constructed, before any file is opened.
    fn prepare(&mut self, _directory: &Path) -> io::Result<()> {
        Ok(())
    }

    fn open(&mut self, path: &Path) -> io::Result<Self::Writer>;
}

/// Opens real files in append mode, creating the parent directory first.
///
/// Files are opened so other processes can read (and tail) them while the
/// sink is writing.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsOpener;

impl LogFileOpener for FsOpener {
    type Writer = File;

    fn prepare(&mut self, directory: &Path) -> io::Result<()> {
        fs::create_dir_all(directory)
    }

    fn open(&mut self, path: &Path) -> io::Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(windows)]
        {
            use std::os::windows::fs::OpenOptionsExt;
            const FILE_SHARE_READ: u32 = 0x0000_0001;
            const FILE_SHARE_WRITE: u32 = 0x0000_0002;
            options.share_mode(FILE_SHARE_READ | FILE_SHARE_WRITE);
        }
        options.open(path)
    }
}

/// File name used for records dated `date`.
pub fn file_name_for(date: NaiveDate) -> String {
    format!("log-{}.txt", date.format("%Y%m%d"))
}

struct OpenLog<W> {
    date: NaiveDate,
    path: PathBuf,
    writer: W,
}

/// Tracks the currently open file and swaps it when the date changes.
pub struct DailyRotation<O: LogFileOpener = FsOpener> {
    directory: PathBuf,
    opener: O,
    current: Option<OpenLog<O::Writer>>,
}

impl DailyRotation<FsOpener> {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_opener(directory, FsOpener)
    }
}

impl<O: LogFileOpener> DailyRotation<O> {
    pub fn with_opener(directory: impl Into<PathBuf>, opener: O) -> Self {
        Self {
            directory: directory.into(),
            opener,
            current: None,
        }
    }

    /// Let the opener set up the directory ahead of the first record.
    pub fn prepare(&mut self) -> io::Result<()> {
        self.opener.prepare(&self.directory)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full path of the file holding records dated `date`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(file_name_for(date))
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|open| open.path.as_path())
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current.as_ref().map(|open| open.date)
    }

    /// Return the writer for `date`, rotating first if the open file belongs
    /// to a different day or no file is open yet.
    pub fn writer_for(&mut self, date: NaiveDate) -> io::Result<&mut O::Writer> {
        let stale = self.current.as_ref().is_none_or(|open| open.date != date);
        if stale {
            self.close_current();
            let path = self.path_for(date);
            let writer = self.opener.open(&path)?;
            self.current = Some(OpenLog { date, path, writer });
        }
        match self.current.as_mut() {
            Some(open) => Ok(&mut open.writer),
            None => Err(io::Error::other("log file not open after rotation")),
        }
    }

    /// Drop the open file so the next write reopens it.
    ///
    /// Used after a failed write; the handle may be in an unknown state.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Flush and close the open file, if any.
    pub fn close(&mut self) -> io::Result<()> {
        match self.current.take() {
            Some(mut open) => open.writer.flush(),
            None => Ok(()),
        }
    }

    fn close_current(&mut self) {
        if let Some(mut open) = self.current.take()
            && let Err(err) = open.writer.flush()
        {
            warn!(
                target: DIAGNOSTIC_TARGET,
                "FemtoSink: flush failed while rotating away from {}: {err}",
                open.path.display()
            );
        }
    }
}
