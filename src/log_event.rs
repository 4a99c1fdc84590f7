//! Log event representation for the sink.
//!
//! A [`FemtoLogEvent`] is built once at the call site and then moved through
//! the ingestion queue to the worker thread. It is never mutated after
//! construction.

use std::fmt;

use chrono::{DateTime, Local, NaiveDate};

use crate::level::FemtoLevel;

/// Error details attached to a record, rendered below the message line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Human readable description of the failure.
    pub message: String,
    /// Stack trace or cause chain; may be empty.
    pub trace: String,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Capture an error together with its `source()` chain as the trace.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = String::new();
        let mut source = err.source();
        while let Some(cause) = source {
            if !trace.is_empty() {
                trace.push('\n');
            }
            trace.push_str("caused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(err.to_string(), trace)
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.trace.is_empty() {
            write!(f, "\n{}", self.trace)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct FemtoLogEvent {
    timestamp: DateTime<Local>,
    level: FemtoLevel,
    category: String,
    message: String,
    error: Option<ErrorDetail>,
}

impl FemtoLogEvent {
    /// Construct an event stamped with the current local time.
    pub fn new(level: FemtoLevel, category: &str, message: &str) -> Self {
        Self::at(Local::now(), level, category, message)
    }

    /// Construct an event with an explicit capture time.
    pub fn at(
        timestamp: DateTime<Local>,
        level: FemtoLevel,
        category: &str,
        message: &str,
    ) -> Self {
        Self {
            timestamp,
            level,
            category: category.to_owned(),
            message: message.to_owned(),
            error: None,
        }
    }

    /// Attach error details to the event.
    pub fn with_error(mut self, error: ErrorDetail) -> Self {
        self.error = Some(error);
        self
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// Local calendar date used to select the output file.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn level(&self) -> FemtoLevel {
        self.level
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }
}

impl fmt::Display for FemtoLogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}
