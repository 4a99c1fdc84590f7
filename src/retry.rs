//! Retry policy for record writes.
//!
//! A [`RetryPolicy`] bundles the attempt budget, the backoff schedule, and
//! the rule deciding which I/O errors are worth retrying. The worker drives
//! each write through [`RetryPolicy::run`]; backoff sleeps are interruptible
//! so forced shutdown never waits out a delay.

use std::{io, time::Duration};

use crate::{cancel::CancelToken, error::ConfigError, error::WriteFailure};

/// Default number of attempts per record.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Whether a failure may clear up if the write is tried again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Permanent,
}

/// Maps an I/O error onto a [`FailureKind`].
pub type Classifier = fn(&io::Error) -> FailureKind;

/// Errors that retrying cannot fix. Everything else is assumed transient,
/// including contention on a locked file.
pub fn default_classifier(err: &io::Error) -> FailureKind {
    use io::ErrorKind::*;
    match err.kind() {
        InvalidInput | InvalidData | Unsupported | NotADirectory | IsADirectory
        | ReadOnlyFilesystem | StorageFull | FileTooLarge => FailureKind::Permanent,
        _ => FailureKind::Transient,
    }
}

/// Delay schedule between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^attempt` for the zero-based attempt that just failed.
    Exponential { base: Duration },
    Fixed(Duration),
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Exponential { base } if base.is_zero() => Duration::ZERO,
            Backoff::Exponential { base } => 2u32
                .checked_pow(attempt)
                .map_or(Duration::MAX, |factor| base.saturating_mul(factor)),
            Backoff::Fixed(delay) => delay,
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            base: DEFAULT_BACKOFF_BASE,
        }
    }
}

/// Attempt budget, backoff, and classification for a write.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    classify: Classifier,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
            classify: default_classifier,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            backoff,
            classify: default_classifier,
        })
    }

    /// Replace the rule deciding which errors are retried.
    pub fn with_classifier(mut self, classify: Classifier) -> Self {
        self.classify = classify;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn classify(&self, err: &io::Error) -> FailureKind {
        (self.classify)(err)
    }

    /// Run `op` until it succeeds or the policy gives up.
    ///
    /// `op` receives the zero-based attempt number. `on_retry` is called with
    /// the failed attempt, its error, and the delay about to be slept.
    pub(crate) fn run<T>(
        &self,
        cancel: &CancelToken,
        mut op: impl FnMut(u32) -> io::Result<T>,
        mut on_retry: impl FnMut(u32, &io::Error, Duration),
    ) -> Result<T, WriteFailure> {
        let mut attempt = 0;
        loop {
            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            let attempts = attempt + 1;
            if self.classify(&err) == FailureKind::Permanent {
                return Err(WriteFailure::Permanent {
                    attempts,
                    source: err,
                });
            }
            if attempts >= self.max_attempts {
                return Err(WriteFailure::Exhausted {
                    attempts,
                    source: err,
                });
            }
            let delay = self.backoff.delay(attempt);
            on_retry(attempt, &err, delay);
            if !cancel.sleep(delay) {
                return Err(WriteFailure::Cancelled {
                    attempts,
                    source: err,
                });
            }
            attempt += 1;
        }
    }
}
