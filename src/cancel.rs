//! One-shot cancellation signal shared between the sink and its worker.
//!
//! Cancelling drops the only sender, which disconnects the channel. Every
//! receiver then observes the disconnect immediately, so the same token can
//! interrupt a blocking take, a backoff sleep, or a plain poll.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use parking_lot::Mutex;

/// Owning half held by the lifecycle controller.
pub(crate) struct CancelHandle {
    tx: Mutex<Option<Sender<()>>>,
}

/// Observing half held by the worker.
#[derive(Clone)]
pub(crate) struct CancelToken {
    rx: Receiver<()>,
}

pub(crate) fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = bounded(0);
    (
        CancelHandle {
            tx: Mutex::new(Some(tx)),
        },
        CancelToken { rx },
    )
}

impl CancelHandle {
    /// Signal cancellation. Returns `false` if it was already signalled.
    pub(crate) fn cancel(&self) -> bool {
        self.tx.lock().take().is_some()
    }
}

impl CancelToken {
    pub(crate) fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected) | Ok(()))
    }

    /// Sleep for `delay` unless cancelled first. Returns `true` when the full
    /// delay elapsed.
    pub(crate) fn sleep(&self, delay: Duration) -> bool {
        matches!(self.rx.recv_timeout(delay), Err(RecvTimeoutError::Timeout))
    }

    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
