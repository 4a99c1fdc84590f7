//! Error types surfaced by the sink.
//!
//! Only construction and configuration errors reach callers as `Err`.
//! [`EmitError`] is returned by [`FemtoSink::try_emit`](crate::FemtoSink::try_emit)
//! for callers that want to know why a record was not queued; `emit` swallows
//! it. [`WriteFailure`] never leaves the worker thread and exists so the
//! worker can describe a dropped record on the diagnostic channel.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Errors raised while constructing a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn sink worker thread: {0}")]
    SpawnWorker(#[source] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while reading or validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid overflow policy '{0}'. Valid options are: drop, drop-newest, drop-oldest, block, timeout:N")]
    InvalidPolicy(String),
    #[error("timeout must be a positive integer (N in 'timeout:N')")]
    InvalidTimeout,
    #[error("capacity must be greater than zero")]
    ZeroCapacity,
    #[error("max_attempts must be greater than zero")]
    ZeroAttempts,
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("failed to read configuration {path}: {message}")]
    Read { path: PathBuf, message: String },
    #[error("configuration {path} is invalid: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Reasons a record could not be queued.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    #[error("level is disabled")]
    Disabled,
    #[error("sink is closed")]
    Closed,
    #[error("queue full")]
    QueueFull,
    #[error("timed out after {0:?} waiting for queue space")]
    Timeout(Duration),
}

/// Why the worker gave up on a record.
#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error("permanent I/O failure after {attempts} attempt(s): {source}")]
    Permanent {
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("cancelled during retry backoff after {attempts} attempt(s): {source}")]
    Cancelled {
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("write path panicked: {0}")]
    Panicked(String),
}
