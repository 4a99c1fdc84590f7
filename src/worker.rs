//! Background worker thread for [`FemtoSink`](crate::FemtoSink).
//!
//! The worker is the only owner of the open log file. It takes commands from
//! the ingestion queue in order, rotates when a record's date differs from
//! the open file, and writes each record through the retry policy. Nothing
//! that goes wrong here reaches producer threads: failures are counted and
//! reported on the diagnostic channel, and the loop moves on to the next
//! record.

use std::{
    io::{self, Write},
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
    thread::{self, JoinHandle},
};

use chrono::NaiveDate;
use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, warn};

use crate::{
    cancel::CancelToken,
    diagnostics::{self, DIAGNOSTIC_TARGET, DropReason, SinkCounters},
    error::WriteFailure,
    formatter::FemtoFormatter,
    log_event::FemtoLogEvent,
    queue::{QueueReader, SinkCommand, Take},
    retry::RetryPolicy,
    rotation::{DailyRotation, LogFileOpener},
};

/// Observable state of the worker loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Waiting for the next record.
    Idle = 0,
    /// Rotating and writing a record.
    Processing = 1,
    /// Completion was signalled; writing whatever is still queued.
    Draining = 2,
    /// The file is closed and the thread has finished.
    Stopped = 3,
}

/// Shared cell the worker publishes its state through.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Idle as u8))
    }

    pub(crate) fn get(&self) -> WorkerState {
        match self.0.load(Ordering::Acquire) {
            0 => WorkerState::Idle,
            1 => WorkerState::Processing,
            2 => WorkerState::Draining,
            _ => WorkerState::Stopped,
        }
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

pub(crate) struct Worker<O: LogFileOpener, F> {
    pub(crate) reader: QueueReader,
    pub(crate) rotation: DailyRotation<O>,
    pub(crate) formatter: F,
    pub(crate) retry: RetryPolicy,
    pub(crate) cancel: CancelToken,
    pub(crate) counters: Arc<SinkCounters>,
    pub(crate) state: Arc<StateCell>,
}

/// Spawn `worker` on a named thread.
///
/// The returned receiver fires once the worker has closed its file and is
/// about to exit.
pub(crate) fn spawn_worker<O, F>(
    worker: Worker<O, F>,
) -> io::Result<(JoinHandle<()>, Receiver<()>)>
where
    O: LogFileOpener + 'static,
    F: FemtoFormatter + 'static,
{
    let (done_tx, done_rx) = bounded(1);
    let handle = thread::Builder::new()
        .name("femtosink-worker".into())
        .spawn(move || worker.run(done_tx))?;
    Ok((handle, done_rx))
}

impl<O: LogFileOpener, F: FemtoFormatter> Worker<O, F> {
    pub(crate) fn run(mut self, done_tx: Sender<()>) {
        loop {
            let draining = self.reader.is_completed();
            self.state.set(if draining {
                WorkerState::Draining
            } else {
                WorkerState::Idle
            });
            match self.reader.take(&self.cancel) {
                Take::Item(SinkCommand::Event(event)) => {
                    if !draining {
                        self.state.set(WorkerState::Processing);
                    }
                    self.process(&event);
                }
                Take::Item(SinkCommand::Flush(ack)) => {
                    // Every write is already flushed; the ack only confirms
                    // that everything queued before it has been handled.
                    let _ = ack.send(());
                }
                Take::Completed => break,
                Take::Cancelled => {
                    let dropped = self.reader.discard_remaining();
                    if dropped > 0 {
                        self.counters.record_drop(DropReason::Cancelled, dropped);
                        diagnostics::report_cancelled(dropped);
                    }
                    break;
                }
            }
        }
        if let Err(err) = self.rotation.close() {
            warn!(target: DIAGNOSTIC_TARGET, "FemtoSink: flush error while closing log file: {err}");
        }
        self.state.set(WorkerState::Stopped);
        let _ = done_tx.send(());
    }

    fn process(&mut self, event: &FemtoLogEvent) {
        let Self {
            rotation,
            formatter,
            retry,
            cancel,
            counters,
            ..
        } = self;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let rendered = formatter.format(event);
            let date = event.date();
            retry.run(
                cancel,
                |_| write_record(rotation, date, rendered.as_bytes()),
                |attempt, err, delay| {
                    counters.record_retry();
                    debug!(
                        target: DIAGNOSTIC_TARGET,
                        "FemtoSink: write attempt {} failed: {err}; retrying in {delay:?}",
                        attempt + 1
                    );
                },
            )
        }));
        let result = outcome.unwrap_or_else(|payload| {
            self.rotation.invalidate();
            Err(WriteFailure::Panicked(panic_message(payload.as_ref())))
        });
        match result {
            Ok(()) => self.counters.record_written(),
            Err(failure) => {
                self.counters.record_drop(DropReason::WriteFailed, 1);
                diagnostics::report_write_failure(event, &failure);
            }
        }
    }
}

fn write_record<O: LogFileOpener>(
    rotation: &mut DailyRotation<O>,
    date: NaiveDate,
    bytes: &[u8],
) -> io::Result<()> {
    let result = rotation.writer_for(date).and_then(|writer| {
        writer.write_all(bytes)?;
        writer.flush()
    });
    if result.is_err() {
        rotation.invalidate();
    }
    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
