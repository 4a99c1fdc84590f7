//! Sink configuration and the sources it can be read from.
//!
//! [`SinkConfig`] is plain data with builder-style setters. Applications that
//! keep their settings in an `appsettings.json` style document or an INI file
//! can load it through [`ConfigSource`], which resolves colon-separated keys
//! such as `Logging:LogLevel:Default`.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use ini::Ini;
use serde_json::Value;

use crate::{
    error::ConfigError,
    level::FemtoLevel,
    queue::QueueMode,
    rate_limited_warner::DEFAULT_WARN_INTERVAL,
    retry::RetryPolicy,
};

/// Directory used when none is configured.
pub const DEFAULT_DIRECTORY: &str = "Logs";
/// How long `close` waits for the worker to drain the queue.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
/// How long `close` waits after forcing cancellation.
pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_secs(1);

/// Keys read by [`SinkConfig::from_source`].
pub mod keys {
    pub const FILE_LOGGING: &str = "FileLogging";
    /// Older layout nesting the switch under a `CustomLogging` section.
    pub const CUSTOM_FILE_LOGGING: &str = "CustomLogging:FileLogging";
    pub const DIRECTORY: &str = "FileLoggingDirectory";
    pub const MIN_LEVEL: &str = "Logging:LogLevel:Default";
    pub const QUEUE_CAPACITY: &str = "FileLoggingQueueCapacity";
    pub const OVERFLOW_POLICY: &str = "FileLoggingOverflowPolicy";
}

/// Configuration options for constructing a [`FemtoSink`](crate::FemtoSink).
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Whether file logging is switched on at all.
    pub enabled: bool,
    /// Directory holding the `log-YYYYMMDD.txt` files.
    pub directory: PathBuf,
    /// Records below this level are discarded at the call site.
    pub min_level: FemtoLevel,
    pub queue: QueueMode,
    pub grace_period: Duration,
    pub cancel_timeout: Duration,
    pub retry: RetryPolicy,
    /// Minimum spacing between repeated drop warnings.
    pub warn_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            min_level: FemtoLevel::Information,
            queue: QueueMode::Unbounded,
            grace_period: DEFAULT_GRACE_PERIOD,
            cancel_timeout: DEFAULT_CANCEL_TIMEOUT,
            retry: RetryPolicy::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl SinkConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn with_min_level(mut self, level: FemtoLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_queue(mut self, queue: QueueMode) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_cancel_timeout(mut self, cancel_timeout: Duration) -> Self {
        self.cancel_timeout = cancel_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_warn_interval(mut self, interval: Duration) -> Self {
        self.warn_interval = interval;
        self
    }

    /// Read the configuration from `source`.
    ///
    /// File logging is off unless the source switches it on. An unparseable
    /// minimum level falls back to `Information` rather than failing.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, ConfigError> {
        let enabled = match source
            .get(keys::FILE_LOGGING)
            .or_else(|| source.get(keys::CUSTOM_FILE_LOGGING))
        {
            Some(raw) => parse_bool(keys::FILE_LOGGING, &raw)?,
            None => false,
        };
        let directory = source
            .get(keys::DIRECTORY)
            .filter(|d| !d.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DIRECTORY), PathBuf::from);
        let min_level = source
            .get(keys::MIN_LEVEL)
            .map_or(FemtoLevel::Information, |raw| {
                FemtoLevel::parse_or_information(&raw)
            });
        let capacity = source
            .get(keys::QUEUE_CAPACITY)
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: keys::QUEUE_CAPACITY.to_owned(),
                        value: raw.clone(),
                    })
            })
            .transpose()?;
        let policy = source.get(keys::OVERFLOW_POLICY);
        let queue = QueueMode::from_parts(capacity, policy.as_deref())?;
        Ok(Self {
            enabled,
            directory,
            min_level,
            queue,
            ..Self::default()
        })
    }

    /// Load an `appsettings.json` style document.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_config(path)?;
        let value: Value = serde_json::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_source(&value)
    }

    /// Load an INI file.
    ///
    /// The last segment of a key is the INI key and anything before it names
    /// the section, so `Logging:LogLevel:Default` reads `Default` from
    /// `[Logging:LogLevel]`.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_config(path)?;
        let ini = Ini::load_from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_source(&ini)
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|err| ConfigError::Read {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_owned(),
            value: raw.to_owned(),
        }),
    }
}

/// A process-wide configuration source.
///
/// Keys are colon-separated paths, matched case-insensitively.
pub trait ConfigSource {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for Value {
    fn get(&self, key: &str) -> Option<String> {
        let mut node = self;
        for segment in key.split(':') {
            let map = node.as_object()?;
            node = map
                .get(segment)
                .or_else(|| {
                    map.iter()
                        .find(|(k, _)| k.eq_ignore_ascii_case(segment))
                        .map(|(_, v)| v)
                })?;
        }
        match node {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl ConfigSource for Ini {
    fn get(&self, key: &str) -> Option<String> {
        let (section, name) = match key.rsplit_once(':') {
            Some((section, name)) => (Some(section), name),
            None => (None, key),
        };
        self.iter()
            .filter(|(s, _)| match (s, section) {
                (None, None) => true,
                (Some(s), Some(wanted)) => s.eq_ignore_ascii_case(wanted),
                _ => false,
            })
            .find_map(|(_, props)| {
                props
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.to_owned())
            })
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.clone())
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.clone())
    }
}
