//! Coalesces repeated drop warnings.
//!
//! A sink under sustained overflow can drop thousands of records a second.
//! Each drop is counted here and at most one warning per interval reports the
//! accumulated total.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// How often to emit warnings about dropped log records.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Sentinel meaning "no warning emitted yet".
const NEVER: u64 = u64::MAX;

fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Counts drops and decides when the next warning may go out.
///
/// Time is measured on a monotonic clock from the warner's creation, so
/// wall-clock jumps cannot silence or flood warnings. The first warning is
/// never delayed.
pub struct RateLimitedWarner {
    origin: Instant,
    interval_ms: u64,
    last_warn_ms: AtomicU64,
    pending: AtomicU64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarner {
    pub fn new(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval_ms: saturating_millis(interval),
            last_warn_ms: AtomicU64::new(NEVER),
            pending: AtomicU64::new(0),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        saturating_millis(self.origin.elapsed())
    }

    pub fn record_drop(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Report the pending count through `warn` if the interval has passed.
    ///
    /// When several threads race, only the one that claims the slot warns.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        let now = self.elapsed_ms();
        let last = self.last_warn_ms.load(Ordering::Relaxed);
        let due = last == NEVER || now.saturating_sub(last) >= self.interval_ms;
        if !due {
            return;
        }
        if self
            .last_warn_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let count = self.pending.swap(0, Ordering::AcqRel);
        if count > 0 {
            warn(count);
        }
    }

    /// Report whatever is pending right away, ignoring the interval.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.pending.swap(0, Ordering::AcqRel);
        if count > 0 {
            self.last_warn_ms.store(self.elapsed_ms(), Ordering::Relaxed);
            warn(count);
        }
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }
}
