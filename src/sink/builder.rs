//! Construction of [`FemtoSink`] with pluggable collaborators.
//!
//! Production code only ever needs [`FemtoSink::open`]. The builder exists so
//! the file opener, formatter and clock can be swapped without widening the
//! sink's own type.

use std::sync::{Arc, atomic::AtomicBool};

use parking_lot::Mutex;

use crate::{
    cancel::cancel_pair,
    clock::{Clock, SystemClock},
    config::SinkConfig,
    diagnostics::{DropWarner, SinkCounters},
    error::SinkError,
    formatter::{DefaultFormatter, FemtoFormatter},
    level::FemtoLevel,
    queue::ingest_queue,
    rotation::{DailyRotation, FsOpener, LogFileOpener},
    worker::{StateCell, Worker, spawn_worker},
};

use super::FemtoSink;

/// Assembles a [`FemtoSink`] from a [`SinkConfig`] plus optional overrides.
pub struct SinkBuilder<O = FsOpener, F = DefaultFormatter> {
    config: SinkConfig,
    opener: O,
    formatter: F,
    clock: Arc<dyn Clock>,
}

impl SinkBuilder {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            opener: FsOpener,
            formatter: DefaultFormatter,
            clock: Arc::new(SystemClock),
        }
    }
}

impl<O, F> SinkBuilder<O, F> {
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Replace the file opener used by the worker.
    pub fn with_opener<O2: LogFileOpener>(self, opener: O2) -> SinkBuilder<O2, F> {
        SinkBuilder {
            config: self.config,
            opener,
            formatter: self.formatter,
            clock: self.clock,
        }
    }

    pub fn with_formatter<F2: FemtoFormatter>(self, formatter: F2) -> SinkBuilder<O, F2> {
        SinkBuilder {
            config: self.config,
            opener: self.opener,
            formatter,
            clock: self.clock,
        }
    }

    /// Stamp events with `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

impl<O, F> SinkBuilder<O, F>
where
    O: LogFileOpener + 'static,
    F: FemtoFormatter + 'static,
{
    /// Prepare the log directory and start the worker thread.
    ///
    /// A disabled configuration yields a sink that accepts nothing and never
    /// touches the filesystem.
    pub fn open(self) -> Result<FemtoSink, SinkError> {
        let Self {
            config,
            opener,
            formatter,
            clock,
        } = self;
        let mut rotation = DailyRotation::with_opener(&config.directory, opener);
        let min_level = if config.enabled {
            rotation
                .prepare()
                .map_err(|source| SinkError::CreateDirectory {
                    path: config.directory.clone(),
                    source,
                })?;
            config.min_level
        } else {
            FemtoLevel::None
        };

        let (queue, reader) = ingest_queue(config.queue);
        let (cancel, token) = cancel_pair();
        let counters = Arc::new(SinkCounters::default());
        let state = Arc::new(StateCell::new());
        let worker = Worker {
            reader,
            rotation,
            formatter,
            retry: config.retry.clone(),
            cancel: token,
            counters: Arc::clone(&counters),
            state: Arc::clone(&state),
        };
        let (handle, done_rx) = spawn_worker(worker).map_err(SinkError::SpawnWorker)?;

        Ok(FemtoSink {
            queue,
            min_level,
            clock,
            counters,
            state,
            warner: DropWarner::new(config.warn_interval),
            cancel,
            worker: Mutex::new(Some((handle, done_rx))),
            closing: AtomicBool::new(false),
            grace_period: config.grace_period,
            cancel_timeout: config.cancel_timeout,
            directory: config.directory,
        })
    }
}
