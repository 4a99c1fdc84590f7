//! Ingestion queue between call sites and the worker thread.
//!
//! Producers push through [`IngestQueue`]; the worker owns the single
//! [`QueueReader`]. Completing the queue drops the producer-side channel ends,
//! so the reader keeps returning whatever is already buffered and then reports
//! [`Take::Completed`] instead of blocking forever. Producers waiting on a full
//! bounded queue are released at the same moment and report
//! [`EmitError::Closed`].

mod policy;

pub use policy::{OverflowPolicy, QueueMode};

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crossbeam_channel::{
    Receiver, Sender, TryRecvError, TrySendError, bounded, select, unbounded,
};
use parking_lot::RwLock;

use crate::{cancel::CancelToken, error::EmitError, log_event::FemtoLogEvent};

/// Items carried by the queue.
#[derive(Debug)]
pub(crate) enum SinkCommand {
    Event(Box<FemtoLogEvent>),
    Flush(Sender<()>),
}

/// Result of a blocking take on the reader.
pub(crate) enum Take {
    Item(SinkCommand),
    /// The queue was completed and everything buffered has been taken.
    Completed,
    /// Forced cancellation was signalled before the next item arrived.
    Cancelled,
}

/// Channel ends dropped together when the queue is completed.
struct Producers {
    tx: Sender<SinkCommand>,
    // Only used by `DropOldest` to evict from the head.
    evict_rx: Receiver<SinkCommand>,
    // Never sent on. Dropping it disconnects `IngestQueue::closed_rx`.
    _closed_tx: Sender<()>,
}

/// Producer side of the queue. Shared by every caller thread.
pub(crate) struct IngestQueue {
    producers: RwLock<Option<Producers>>,
    closed_rx: Receiver<()>,
    mode: QueueMode,
    completed: Arc<AtomicBool>,
}

/// Consumer side of the queue, owned by the worker.
pub(crate) struct QueueReader {
    rx: Receiver<SinkCommand>,
    completed: Arc<AtomicBool>,
}

pub(crate) fn ingest_queue(mode: QueueMode) -> (IngestQueue, QueueReader) {
    let (tx, rx) = match mode {
        QueueMode::Unbounded => unbounded(),
        QueueMode::Bounded { capacity, .. } => bounded(capacity),
    };
    let (closed_tx, closed_rx) = bounded(0);
    let completed = Arc::new(AtomicBool::new(false));
    (
        IngestQueue {
            producers: RwLock::new(Some(Producers {
                tx,
                evict_rx: rx.clone(),
                _closed_tx: closed_tx,
            })),
            closed_rx,
            mode,
            completed: Arc::clone(&completed),
        },
        QueueReader { rx, completed },
    )
}

impl IngestQueue {
    /// Insert `cmd` according to the queue's mode.
    ///
    /// On success returns the command evicted to make room, if any.
    pub(crate) fn push(&self, cmd: SinkCommand) -> Result<Option<SinkCommand>, EmitError> {
        match self.mode {
            QueueMode::Unbounded => {
                let guard = self.producers.read();
                let producers = guard.as_ref().ok_or(EmitError::Closed)?;
                producers
                    .tx
                    .send(cmd)
                    .map(|()| None)
                    .map_err(|_| EmitError::Closed)
            }
            QueueMode::Bounded { overflow, .. } => self.push_bounded(cmd, overflow),
        }
    }

    fn push_bounded(
        &self,
        cmd: SinkCommand,
        overflow: OverflowPolicy,
    ) -> Result<Option<SinkCommand>, EmitError> {
        match overflow {
            OverflowPolicy::DropNewest => {
                let guard = self.producers.read();
                let producers = guard.as_ref().ok_or(EmitError::Closed)?;
                match producers.tx.try_send(cmd) {
                    Ok(()) => Ok(None),
                    Err(TrySendError::Full(_)) => Err(EmitError::QueueFull),
                    Err(TrySendError::Disconnected(_)) => Err(EmitError::Closed),
                }
            }
            OverflowPolicy::DropOldest => {
                let guard = self.producers.read();
                let producers = guard.as_ref().ok_or(EmitError::Closed)?;
                let mut pending = cmd;
                let mut evicted = None;
                loop {
                    match producers.tx.try_send(pending) {
                        Ok(()) => return Ok(evicted),
                        Err(TrySendError::Full(back)) => {
                            pending = back;
                            match producers.evict_rx.try_recv() {
                                // Keep the first eviction; later ones only
                                // happen when racing other producers.
                                Ok(old) => {
                                    evicted.get_or_insert(old);
                                }
                                Err(TryRecvError::Empty) => {}
                                Err(TryRecvError::Disconnected) => return Err(EmitError::Closed),
                            }
                        }
                        Err(TrySendError::Disconnected(_)) => return Err(EmitError::Closed),
                    }
                }
            }
            // Waiting producers hold a sender clone rather than the read lock,
            // so `complete` is never held up behind them. Completion
            // disconnects `closed_rx`, which wakes them with `Closed`.
            OverflowPolicy::Block => {
                let tx = self.sender().ok_or(EmitError::Closed)?;
                select! {
                    send(tx, cmd) -> res => res.map(|()| None).map_err(|_| EmitError::Closed),
                    recv(self.closed_rx) -> _ => Err(EmitError::Closed),
                }
            }
            OverflowPolicy::Timeout(dur) => {
                let tx = self.sender().ok_or(EmitError::Closed)?;
                select! {
                    send(tx, cmd) -> res => res.map(|()| None).map_err(|_| EmitError::Closed),
                    recv(self.closed_rx) -> _ => Err(EmitError::Closed),
                    default(dur) => Err(EmitError::Timeout(dur)),
                }
            }
        }
    }

    fn sender(&self) -> Option<Sender<SinkCommand>> {
        self.producers.read().as_ref().map(|p| p.tx.clone())
    }

    /// Mark the queue complete. Only the first call has any effect.
    pub(crate) fn complete(&self) -> bool {
        let mut guard = self.producers.write();
        if guard.is_none() {
            return false;
        }
        self.completed.store(true, Ordering::Release);
        guard.take();
        true
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

impl QueueReader {
    /// Block until the next item, completion, or cancellation.
    pub(crate) fn take(&self, cancel: &CancelToken) -> Take {
        if cancel.is_cancelled() {
            return Take::Cancelled;
        }
        select! {
            recv(self.rx) -> msg => match msg {
                Ok(cmd) => Take::Item(cmd),
                Err(_) => Take::Completed,
            },
            recv(cancel.receiver()) -> _ => Take::Cancelled,
        }
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Discard everything still buffered, returning how many events were lost.
    ///
    /// Once the queue is completed this also waits for producers still inside
    /// a blocking push, so a record they manage to enqueue is counted too.
    pub(crate) fn discard_remaining(&self) -> u64 {
        let is_event = |cmd: &SinkCommand| matches!(cmd, SinkCommand::Event(_));
        let discarded = if self.is_completed() {
            self.rx.iter().filter(is_event).count()
        } else {
            self.rx.try_iter().filter(is_event).count()
        };
        discarded as u64
    }
}
