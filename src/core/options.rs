//! Timing options for the watch loop.

use crate::error::{Result, WatchError};
use config::{Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

/// Default time to wait for an event batch before re-checking the file's timestamp.
pub const DEFAULT_QUIESCENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between timestamp checks in polling mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default pause before retrying a failed subscription.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Timing options for a [`FileWatcher`](crate::core::FileWatcher).
///
/// When loaded from a file or the environment, durations are given in
/// milliseconds:
///
/// ```yaml
/// quiescence_timeout_ms: 10000
/// poll_interval_ms: 5000
/// retry_delay_ms: 1000
/// ```
///
/// Missing keys keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Longest wait for OS events before the timestamp is compared directly.
    #[serde(rename = "quiescence_timeout_ms", deserialize_with = "millis")]
    pub quiescence_timeout: Duration,

    /// Sleep between timestamp checks once the watcher has fallen back to polling.
    #[serde(rename = "poll_interval_ms", deserialize_with = "millis")]
    pub poll_interval: Duration,

    /// Pause before retrying a subscription that failed with a transient error.
    /// Zero retries immediately.
    #[serde(rename = "retry_delay_ms", deserialize_with = "millis")]
    pub retry_delay: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            quiescence_timeout: DEFAULT_QUIESCENCE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl WatchOptions {
    /// Load options from a YAML, TOML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, has an unsupported extension,
    /// cannot be parsed, or holds out-of-range values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path.as_ref()), None)
    }

    /// Load options from environment variables such as `{PREFIX}_POLL_INTERVAL_MS`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::load(None, Some(prefix))
    }

    /// Load options from an optional file, then apply environment overrides.
    ///
    /// Environment variables take precedence over the file.
    pub fn load(file: Option<&Path>, env_prefix: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            validate_extension(path)?;
            if !path.exists() {
                return Err(WatchError::Options(format!(
                    "Options file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path).required(true));
        }

        if let Some(prefix) = env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .try_parsing(true),
            );
        }

        let options: WatchOptions = builder.build()?.try_deserialize()?;
        options.validate()?;
        Ok(options)
    }

    /// Reject durations the watch loop cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.quiescence_timeout.is_zero() {
            return Err(WatchError::Options(
                "quiescence timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(WatchError::Options(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            WatchError::Options(format!(
                "Unable to determine file format for: {}",
                path.display()
            ))
        })?;

    match extension {
        "yaml" | "yml" | "toml" | "json" => Ok(()),
        _ => Err(WatchError::Options(format!(
            "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        ))),
    }
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
