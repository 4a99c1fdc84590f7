//! Public API for the asynchronous file sink.
//!
//! [`FemtoSink`] stamps each record at the call site, hands it to the
//! ingestion queue and returns. A dedicated worker thread writes records to
//! `log-YYYYMMDD.txt` files in the configured directory.
//!
//! Shutdown goes through [`FemtoSink::close`], which is also run on drop:
//!
//! 1. the queue is completed, so later records are dropped and counted;
//! 2. the worker gets `grace_period` to drain what is already queued;
//! 3. if it is still busy, cancellation is signalled and the worker gets a
//!    further `cancel_timeout` to discard the rest and close its file;
//! 4. the worker thread is joined.

mod builder;

pub use builder::SinkBuilder;

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use log::warn;
use parking_lot::Mutex;

use crate::{
    cancel::CancelHandle,
    clock::Clock,
    config::{ConfigSource, SinkConfig},
    diagnostics::{DIAGNOSTIC_TARGET, DropReason, DropWarner, SinkCounters, SinkStats},
    error::{EmitError, SinkError},
    level::FemtoLevel,
    log_event::{ErrorDetail, FemtoLogEvent},
    queue::{IngestQueue, SinkCommand},
    worker::{StateCell, WorkerState},
};

/// How long [`FemtoSink::flush`] waits for the worker's acknowledgement.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Asynchronous, date-rotating file sink.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct FemtoSink {
    queue: IngestQueue,
    min_level: FemtoLevel,
    clock: Arc<dyn Clock>,
    counters: Arc<SinkCounters>,
    state: Arc<StateCell>,
    warner: DropWarner,
    cancel: CancelHandle,
    worker: Mutex<Option<(JoinHandle<()>, Receiver<()>)>>,
    closing: AtomicBool,
    grace_period: Duration,
    cancel_timeout: Duration,
    directory: PathBuf,
}

impl FemtoSink {
    /// Start a sink writing to the files described by `config`.
    pub fn open(config: SinkConfig) -> Result<Self, SinkError> {
        SinkBuilder::new(config).open()
    }

    pub fn builder(config: SinkConfig) -> SinkBuilder {
        SinkBuilder::new(config)
    }

    /// Read the configuration from `source` and start a sink.
    ///
    /// Returns `Ok(None)` when file logging is switched off.
    pub fn open_from_source(source: &dyn ConfigSource) -> Result<Option<Self>, SinkError> {
        let config = SinkConfig::from_source(source)?;
        if !config.enabled {
            return Ok(None);
        }
        Self::open(config).map(Some)
    }

    /// Whether records at `level` would be queued.
    pub fn is_enabled(&self, level: FemtoLevel) -> bool {
        !level.is_disabled() && level >= self.min_level
    }

    /// Queue a record for writing.
    ///
    /// Never blocks on I/O and never fails; records that cannot be queued are
    /// counted in [`SinkStats`] instead.
    pub fn emit(
        &self,
        level: FemtoLevel,
        category: &str,
        message: &str,
        error: Option<ErrorDetail>,
    ) {
        let _ = self.try_emit(level, category, message, error);
    }

    /// Like [`emit`](Self::emit) but reports why a record was not queued.
    pub fn try_emit(
        &self,
        level: FemtoLevel,
        category: &str,
        message: &str,
        error: Option<ErrorDetail>,
    ) -> Result<(), EmitError> {
        if !self.is_enabled(level) {
            return Err(EmitError::Disabled);
        }
        let mut event = FemtoLogEvent::at(self.clock.now(), level, category, message);
        if let Some(detail) = error {
            event = event.with_error(detail);
        }
        self.submit(event)
    }

    /// Queue an already stamped event, bypassing the sink's clock.
    pub fn submit(&self, event: FemtoLogEvent) -> Result<(), EmitError> {
        if !self.is_enabled(event.level()) {
            return Err(EmitError::Disabled);
        }
        match self.queue.push(SinkCommand::Event(Box::new(event))) {
            Ok(evicted) => {
                self.record_eviction(evicted);
                Ok(())
            }
            Err(err) => {
                let reason = match err {
                    EmitError::Closed => DropReason::Closed,
                    _ => DropReason::Overflow,
                };
                self.record_drop(reason);
                Err(err)
            }
        }
    }

    fn record_eviction(&self, evicted: Option<SinkCommand>) {
        if matches!(evicted, Some(SinkCommand::Event(_))) {
            self.record_drop(DropReason::Overflow);
        }
    }

    fn record_drop(&self, reason: DropReason) {
        self.counters.record_drop(reason, 1);
        self.warner.record(reason);
    }

    /// Wait until everything queued so far has been written.
    ///
    /// Returns `false` once the sink is closing, or when the worker does not
    /// acknowledge within [`FLUSH_TIMEOUT`].
    pub fn flush(&self) -> bool {
        if self.closing.load(Ordering::Acquire) {
            return false;
        }
        let (ack_tx, ack_rx) = bounded(1);
        match self.queue.push(SinkCommand::Flush(ack_tx)) {
            Ok(evicted) => {
                self.record_eviction(evicted);
                ack_rx.recv_timeout(FLUSH_TIMEOUT).is_ok()
            }
            Err(_) => false,
        }
    }

    /// Stop accepting records, drain the queue and stop the worker.
    ///
    /// Only the first call does any work; later or concurrent calls return
    /// at once.
    pub fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        self.queue.complete();
        if let Some((handle, done_rx)) = self.worker.lock().take() {
            if self.wait_for_worker(&done_rx) {
                if handle.join().is_err() {
                    warn!(target: DIAGNOSTIC_TARGET, "FemtoSink: worker thread panicked");
                }
            } else {
                warn!(
                    target: DIAGNOSTIC_TARGET,
                    "FemtoSink: worker thread did not stop within {:?} of cancellation; detaching it",
                    self.cancel_timeout
                );
            }
        }
        self.warner.flush();
    }

    fn wait_for_worker(&self, done_rx: &Receiver<()>) -> bool {
        match done_rx.recv_timeout(self.grace_period) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => {}
        }
        warn!(
            target: DIAGNOSTIC_TARGET,
            "FemtoSink: queue not drained within {:?}; cancelling remaining writes",
            self.grace_period
        );
        self.cancel.cancel();
        !matches!(
            done_rx.recv_timeout(self.cancel_timeout),
            Err(RecvTimeoutError::Timeout)
        )
    }

    /// Whether shutdown has begun; records emitted now are dropped.
    pub fn is_closed(&self) -> bool {
        self.queue.is_completed()
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    pub fn stats(&self) -> SinkStats {
        self.counters.snapshot()
    }

    pub fn min_level(&self) -> FemtoLevel {
        self.min_level
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl Drop for FemtoSink {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests;
