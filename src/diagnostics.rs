//! Out-of-band reporting for the sink.
//!
//! Failures inside the sink are never written to the sink's own files.
//! They are reported through the `log` facade under [`DIAGNOSTIC_TARGET`] and
//! tallied in [`SinkStats`]. [`FemtoLogAdapter`](crate::FemtoLogAdapter)
//! refuses to route that target back into a sink so diagnostics cannot
//! recurse.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{error, warn};
use serde::Serialize;

use crate::error::WriteFailure;
use crate::log_event::FemtoLogEvent;
use crate::rate_limited_warner::RateLimitedWarner;

/// `log` target used for every diagnostic the sink emits.
pub const DIAGNOSTIC_TARGET: &str = "femtosink::diagnostics";

/// Categorises why a record was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Emitted after shutdown began.
    Closed,
    /// Rejected or evicted by a bounded queue.
    Overflow,
    /// Still queued when forced cancellation stopped the worker.
    Cancelled,
    /// The write path gave up on it.
    WriteFailed,
}

/// Counters shared between the sink and its worker.
#[derive(Debug, Default)]
pub struct SinkCounters {
    written: AtomicU64,
    retried: AtomicU64,
    write_failures: AtomicU64,
    dropped_closed: AtomicU64,
    dropped_overflow: AtomicU64,
    dropped_cancelled: AtomicU64,
}

/// Point-in-time copy of [`SinkCounters`].
///
/// Serializes as a flat object so it can be exported next to other health
/// metrics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    pub written: u64,
    /// Retry attempts made after a transient failure.
    pub retried: u64,
    pub write_failures: u64,
    pub dropped_closed: u64,
    pub dropped_overflow: u64,
    pub dropped_cancelled: u64,
}

impl SinkStats {
    /// Every record that was accepted or offered but never reached disk.
    pub fn total_dropped(&self) -> u64 {
        self.write_failures + self.dropped_closed + self.dropped_overflow + self.dropped_cancelled
    }
}

impl SinkCounters {
    pub(crate) fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self, reason: DropReason, count: u64) {
        let counter = match reason {
            DropReason::Closed => &self.dropped_closed,
            DropReason::Overflow => &self.dropped_overflow,
            DropReason::Cancelled => &self.dropped_cancelled,
            DropReason::WriteFailed => &self.write_failures,
        };
        counter.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SinkStats {
        SinkStats {
            written: self.written.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            dropped_cancelled: self.dropped_cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Tracks dropped records on the producer side and emits rate-limited
/// warnings.
pub(crate) struct DropWarner {
    closed: RateLimitedWarner,
    overflow: RateLimitedWarner,
}

impl DropWarner {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            closed: RateLimitedWarner::new(interval),
            overflow: RateLimitedWarner::new(interval),
        }
    }

    pub(crate) fn record(&self, reason: DropReason) {
        match reason {
            DropReason::Closed => {
                self.closed.record_drop();
                self.closed.warn_if_due(warn_closed);
            }
            DropReason::Overflow => {
                self.overflow.record_drop();
                self.overflow.warn_if_due(warn_overflow);
            }
            DropReason::Cancelled | DropReason::WriteFailed => {
                // Reported by the worker as they happen.
            }
        }
    }

    pub(crate) fn flush(&self) {
        self.closed.flush(warn_closed);
        self.overflow.flush(warn_overflow);
    }
}

fn warn_closed(count: u64) {
    warn!(
        target: DIAGNOSTIC_TARGET,
        "FemtoSink: {count} log records dropped after the sink was closed"
    );
}

fn warn_overflow(count: u64) {
    warn!(
        target: DIAGNOSTIC_TARGET,
        "FemtoSink: {count} log records dropped because the queue was full"
    );
}

pub(crate) fn report_write_failure(event: &FemtoLogEvent, failure: &WriteFailure) {
    error!(
        target: DIAGNOSTIC_TARGET,
        "FemtoSink: dropping {} record from '{}': {failure}",
        event.level(),
        event.category()
    );
}

pub(crate) fn report_cancelled(count: u64) {
    warn!(
        target: DIAGNOSTIC_TARGET,
        "FemtoSink: shutdown grace period elapsed; {count} queued log records dropped"
    );
}
