//! Asynchronous, crash-tolerant file sink for application logs.
//!
//! Call sites hand records to a [`FemtoSink`], which stamps them and returns
//! immediately. A single worker thread appends them to `log-YYYYMMDD.txt`
//! files, rotating on the record's date and retrying transient I/O failures
//! with exponential backoff.
//!
//! ```no_run
//! use femtosink::{FemtoLevel, FemtoSink, SinkConfig};
//!
//! let sink = FemtoSink::open(SinkConfig::new("Logs"))?;
//! sink.emit(FemtoLevel::Information, "startup", "service ready", None);
//! sink.close();
//! # Ok::<(), femtosink::SinkError>(())
//! ```

mod cancel;
pub mod clock;
pub mod config;
pub mod diagnostics;
mod error;
pub mod formatter;
mod level;
mod log_compat;
mod log_event;
pub mod queue;
mod rate_limited_warner;
pub mod retry;
pub mod rotation;
mod sink;
mod worker;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigSource, SinkConfig};
pub use diagnostics::{DIAGNOSTIC_TARGET, SinkStats};
pub use error::{ConfigError, EmitError, SinkError, WriteFailure};
pub use formatter::{DefaultFormatter, FemtoFormatter};
pub use level::{FemtoLevel, ParseLevelError};
pub use log_compat::{FemtoLogAdapter, level_filter_for};
pub use log_event::{ErrorDetail, FemtoLogEvent};
pub use queue::{OverflowPolicy, QueueMode};
pub use retry::{Backoff, FailureKind, RetryPolicy};
pub use rotation::{DailyRotation, FsOpener, LogFileOpener};
pub use sink::{FLUSH_TIMEOUT, FemtoSink, SinkBuilder};
pub use worker::WorkerState;
