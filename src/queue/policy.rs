//! Queue capacity modes and overflow policy parsing.
//!
//! The sink is unbounded unless configured otherwise. Bounded queues must say
//! what happens when they are full; the accepted policy strings are shared by
//! every configuration source so behaviour stays consistent.

use std::{str::FromStr, time::Duration};

use crate::error::ConfigError;

/// Determines how a bounded queue reacts when it is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the record being emitted, preserving queued ones.
    DropNewest,
    /// Evict the oldest queued record to make room.
    DropOldest,
    /// Block the caller until space becomes available.
    Block,
    /// Block up to the specified duration before giving up.
    Timeout(Duration),
}

/// Capacity of the ingestion queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueMode {
    /// Producers never wait; memory grows if the worker falls behind.
    #[default]
    Unbounded,
    Bounded {
        capacity: usize,
        overflow: OverflowPolicy,
    },
}

impl QueueMode {
    /// Build a mode from optional configuration values.
    ///
    /// A missing or zero capacity means unbounded; a missing policy on a
    /// bounded queue means [`OverflowPolicy::DropNewest`].
    pub fn from_parts(capacity: Option<usize>, policy: Option<&str>) -> Result<Self, ConfigError> {
        match capacity {
            None | Some(0) => Ok(QueueMode::Unbounded),
            Some(capacity) => {
                let overflow = match policy {
                    Some(p) if !p.trim().is_empty() => p.parse()?,
                    _ => OverflowPolicy::DropNewest,
                };
                QueueMode::bounded(capacity, overflow)
            }
        }
    }

    pub fn bounded(capacity: usize, overflow: OverflowPolicy) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(QueueMode::Bounded { capacity, overflow })
    }
}

/// Parses a policy string into an [`OverflowPolicy`].
///
/// # Accepted input formats
/// - "drop" or "drop-newest": drop the new record when the queue is full.
/// - "drop-oldest": evict the oldest queued record.
/// - "block": block until space is available.
/// - "timeout:N": wait up to N milliseconds before dropping (N > 0).
impl FromStr for OverflowPolicy {
    type Err = ConfigError;

    fn from_str(policy: &str) -> Result<Self, Self::Err> {
        let normalized = policy.trim().to_ascii_lowercase();

        if let Some(rest) = normalized.strip_prefix("timeout:") {
            let ms: u64 = rest
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout)?;
            if ms == 0 {
                return Err(ConfigError::InvalidTimeout);
            }
            return Ok(OverflowPolicy::Timeout(Duration::from_millis(ms)));
        }

        match normalized.as_str() {
            "drop" | "drop-newest" => Ok(OverflowPolicy::DropNewest),
            "drop-oldest" => Ok(OverflowPolicy::DropOldest),
            "block" => Ok(OverflowPolicy::Block),
            "timeout" => Err(ConfigError::InvalidTimeout),
            _ => Err(ConfigError::InvalidPolicy(normalized)),
        }
    }
}
