//! Queue and retry settings, with environment and config file support.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set on the config structs directly
//! 2. **Environment variables**: values from `FLOWSYNC_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: [`QueueConfig::default()`] and [`RetryConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `FLOWSYNC_QUEUE_CONCURRENCY` | `usize` | `queue.concurrency` |
//! | `FLOWSYNC_QUEUE_PAYLOAD` | `usize` | `queue.payload` |
//! | `FLOWSYNC_RETRY_ATTEMPTS` | `u32` | `retry.attempts` |

use serde::Deserialize;

use crate::error::{Error, ErrorKind, Result};

/// Environment variable name for queue worker concurrency.
pub const ENV_QUEUE_CONCURRENCY: &str = "FLOWSYNC_QUEUE_CONCURRENCY";
/// Environment variable name for the cargo batch size.
pub const ENV_QUEUE_PAYLOAD: &str = "FLOWSYNC_QUEUE_PAYLOAD";
/// Environment variable name for retry attempts.
pub const ENV_RETRY_ATTEMPTS: &str = "FLOWSYNC_RETRY_ATTEMPTS";

/// Problems found while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set but cannot be parsed.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Expected value shape.
        expected: &'static str,
        /// The raw value.
        value: String,
    },
    /// A count that must be positive is zero.
    #[error("{field} must be at least 1")]
    Zero {
        /// Offending field.
        field: &'static str,
    },
    /// The config document is not valid TOML for this schema.
    #[error("failed to parse TOML config: {0}")]
    Parse(String),
    /// The config file could not be read.
    #[error("failed to read config file {path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::InvalidArgument)
            .with_message(err.to_string())
            .with_source(err)
    }
}

/// Settings for [`Queue`](crate::queue::Queue) and [`Cargo`](crate::queue::Cargo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of concurrently running worker invocations.
    pub concurrency: usize,
    /// Maximum number of items per cargo batch.
    pub payload: usize,
}

impl QueueConfig {
    /// Creates a config with the given concurrency and an unbounded payload.
    #[must_use]
    pub const fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            payload: usize::MAX,
        }
    }

    /// Sets the cargo batch size.
    #[must_use]
    pub const fn payload(mut self, payload: usize) -> Self {
        self.payload = payload;
        self
    }

    /// Checks the concurrency limit only, for queues that ignore `payload`.
    pub fn validate_concurrency(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::Zero {
                field: "queue.concurrency",
            }
            .into());
        }
        Ok(())
    }

    /// Checks that both limits are positive.
    pub fn validate(&self) -> Result<()> {
        self.validate_concurrency()?;
        if self.payload == 0 {
            return Err(ConfigError::Zero {
                field: "queue.payload",
            }
            .into());
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Settings for [`retry`](crate::combinator::retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total number of invocations, the first one included.
    pub attempts: u32,
}

impl RetryConfig {
    /// Creates a validated retry config.
    ///
    /// # Errors
    ///
    /// `ErrorKind::InvalidArgument` if `attempts` is zero.
    pub fn new(attempts: u32) -> Result<Self> {
        let config = Self { attempts };
        config.validate()?;
        Ok(config)
    }

    /// Checks that at least one attempt is allowed.
    pub fn validate(&self) -> Result<()> {
        if self.attempts == 0 {
            return Err(ConfigError::Zero {
                field: "retry.attempts",
            }
            .into());
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { attempts: 3 }
    }
}

/// Combined configuration document.
///
/// ```toml
/// [queue]
/// concurrency = 4
/// payload = 16
///
/// [retry]
/// attempts = 5
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Queue and cargo settings.
    pub queue: QueueConfig,
    /// Retry settings.
    pub retry: RetryConfig,
}

impl FlowConfig {
    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        self.queue.validate()?;
        self.retry.validate()
    }
}

/// Apply environment variable overrides to a [`FlowConfig`].
///
/// Only variables that are set are applied. Returns an error if a variable
/// is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut FlowConfig) -> core::result::Result<(), ConfigError> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Like [`apply_env_overrides`], reading variables through `lookup`.
pub fn apply_overrides_from(
    config: &mut FlowConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> core::result::Result<(), ConfigError> {
    if let Some(val) = lookup(ENV_QUEUE_CONCURRENCY) {
        config.queue.concurrency = parse_usize(ENV_QUEUE_CONCURRENCY, &val)?;
    }
    if let Some(val) = lookup(ENV_QUEUE_PAYLOAD) {
        config.queue.payload = parse_usize(ENV_QUEUE_PAYLOAD, &val)?;
    }
    if let Some(val) = lookup(ENV_RETRY_ATTEMPTS) {
        config.retry.attempts = parse_u32(ENV_RETRY_ATTEMPTS, &val)?;
    }
    Ok(())
}

fn parse_usize(var: &'static str, val: &str) -> core::result::Result<usize, ConfigError> {
    val.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnv {
        var,
        expected: "unsigned integer",
        value: val.to_string(),
    })
}

fn parse_u32(var: &'static str, val: &str) -> core::result::Result<u32, ConfigError> {
    val.trim().parse::<u32>().map_err(|_| ConfigError::InvalidEnv {
        var,
        expected: "u32",
        value: val.to_string(),
    })
}

/// Parse a TOML string into a [`FlowConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> core::result::Result<FlowConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Read and parse a TOML file into a [`FlowConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> core::result::Result<FlowConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = FlowConfig::default();
        assert_eq!(config.queue.concurrency, 1);
        assert_eq!(config.queue.payload, usize::MAX);
        assert_eq!(config.retry.attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_limits_are_invalid_arguments() {
        let err = RetryConfig::new(0).expect_err("zero attempts");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), Some("retry.attempts must be at least 1"));

        let err = QueueConfig::new(0).validate().expect_err("zero concurrency");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(QueueConfig::new(2).payload(0).validate().is_err());
    }

    #[test]
    fn env_overrides_apply_only_set_vars() {
        let mut config = FlowConfig::default();
        apply_overrides_from(
            &mut config,
            env(&[(ENV_QUEUE_CONCURRENCY, " 8 "), (ENV_RETRY_ATTEMPTS, "5")]),
        )
        .expect("valid overrides");
        assert_eq!(config.queue.concurrency, 8);
        assert_eq!(config.queue.payload, usize::MAX);
        assert_eq!(config.retry.attempts, 5);
    }

    #[test]
    fn unparseable_env_value_is_reported() {
        let mut config = FlowConfig::default();
        let err = apply_overrides_from(&mut config, env(&[(ENV_QUEUE_PAYLOAD, "lots")]))
            .expect_err("not a number");
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: ENV_QUEUE_PAYLOAD,
                expected: "unsigned integer",
                value: "lots".to_string(),
            }
        );
        assert_eq!(config, FlowConfig::default());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_sections_fill_missing_fields_with_defaults() {
        let config = parse_toml_str("[queue]\nconcurrency = 4\n\n[retry]\nattempts = 2\n")
            .expect("valid toml");
        assert_eq!(config.queue, QueueConfig::new(4));
        assert_eq!(config.retry.attempts, 2);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_file_round_trip() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[queue]\npayload = 3").expect("write");
        let config = parse_toml_file(file.path()).expect("parse file");
        assert_eq!(config.queue.payload, 3);
        assert_eq!(config.queue.concurrency, 1);

        let missing = parse_toml_file(std::path::Path::new("/nonexistent/flowsync.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            parse_toml_str("[queue]\nconcurrency = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
