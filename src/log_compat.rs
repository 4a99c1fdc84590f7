//! Compatibility bridge for the Rust `log` crate.
//!
//! [`FemtoLogAdapter`] implements `log::Log` on top of a shared
//! [`FemtoSink`], so `log::info!` and friends land in the daily files. The
//! record target becomes the category.
//!
//! The sink reports its own trouble under [`DIAGNOSTIC_TARGET`]. Those
//! records are printed to stderr rather than queued, otherwise a failing
//! write could feed diagnostics back into the sink that produced them.

use std::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::diagnostics::DIAGNOSTIC_TARGET;
use crate::level::FemtoLevel;
use crate::sink::FemtoSink;

/// Adapter implementing the Rust `log::Log` trait.
pub struct FemtoLogAdapter {
    sink: Arc<FemtoSink>,
}

impl From<log::Level> for FemtoLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => FemtoLevel::Trace,
            log::Level::Debug => FemtoLevel::Debug,
            log::Level::Info => FemtoLevel::Information,
            log::Level::Warn => FemtoLevel::Warning,
            log::Level::Error => FemtoLevel::Error,
        }
    }
}

/// Most verbose `log` filter that can still reach a sink at `min_level`.
///
/// Diagnostics are always let through at `Warn` so they reach stderr even
/// when the sink itself is quieter.
pub fn level_filter_for(min_level: FemtoLevel) -> LevelFilter {
    let sink_filter = match min_level {
        FemtoLevel::Trace => LevelFilter::Trace,
        FemtoLevel::Debug => LevelFilter::Debug,
        FemtoLevel::Information => LevelFilter::Info,
        FemtoLevel::Warning => LevelFilter::Warn,
        FemtoLevel::Error | FemtoLevel::Critical => LevelFilter::Error,
        FemtoLevel::None => LevelFilter::Off,
    };
    sink_filter.max(LevelFilter::Warn)
}

fn is_diagnostic(target: &str) -> bool {
    target == DIAGNOSTIC_TARGET
}

impl FemtoLogAdapter {
    pub fn new(sink: Arc<FemtoSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<FemtoSink> {
        &self.sink
    }

    /// Install an adapter over `sink` as the global `log` logger.
    ///
    /// Fails when another global logger is already set.
    pub fn install(sink: Arc<FemtoSink>) -> Result<(), SetLoggerError> {
        let filter = level_filter_for(sink.min_level());
        log::set_boxed_logger(Box::new(Self::new(sink)))?;
        log::set_max_level(filter);
        Ok(())
    }
}

impl Log for FemtoLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        is_diagnostic(metadata.target()) || self.sink.is_enabled(metadata.level().into())
    }

    fn log(&self, record: &Record<'_>) {
        if is_diagnostic(record.target()) {
            eprintln!("[{}] {}", record.level(), record.args());
            return;
        }
        let level = FemtoLevel::from(record.level());
        if !self.sink.is_enabled(level) {
            return;
        }
        let message = record.args().to_string();
        let _ = self.sink.try_emit(level, record.target(), &message, None);
    }

    fn flush(&self) {
        self.sink.flush();
    }
}
