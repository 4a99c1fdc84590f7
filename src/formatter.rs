//! Rendering of [`FemtoLogEvent`] values into file records.
//!
//! The sink renders each event once, on the worker thread, immediately before
//! writing it. Formatters must therefore be `Send + Sync` so the sink can move
//! them into the worker.

use std::{fmt::Write as _, sync::Arc};

use crate::log_event::FemtoLogEvent;

/// Width the level name is right-aligned to inside the brackets.
pub const LEVEL_WIDTH: usize = 11;

/// Trait for formatting log events into strings.
///
/// The returned string is written verbatim, so implementations are
/// responsible for the trailing line terminator.
pub trait FemtoFormatter: Send + Sync {
    fn format(&self, event: &FemtoLogEvent) -> String;
}

/// `HH:mm:ss.fff [      Level] message` followed by any error details.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultFormatter;

impl FemtoFormatter for DefaultFormatter {
    fn format(&self, event: &FemtoLogEvent) -> String {
        let mut output = String::with_capacity(event.message().len() + 32);
        // Writing into a String cannot fail.
        let _ = write!(
            output,
            "{} [{:>width$}] {}",
            event.timestamp().format("%H:%M:%S%.3f"),
            event.level(),
            event.message(),
            width = LEVEL_WIDTH,
        );
        if let Some(error) = event.error() {
            output.push('\n');
            output.push_str(&error.message);
            if !error.trace.is_empty() {
                output.push('\n');
                output.push_str(&error.trace);
            }
        }
        output.push('\n');
        output
    }
}

impl FemtoFormatter for Arc<dyn FemtoFormatter> {
    fn format(&self, event: &FemtoLogEvent) -> String {
        (**self).format(event)
    }
}

impl FemtoFormatter for Box<dyn FemtoFormatter> {
    fn format(&self, event: &FemtoLogEvent) -> String {
        (**self).format(event)
    }
}
