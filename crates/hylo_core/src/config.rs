//! Core runtime configuration.
//!
//! # Responsibility
//! - Load JSON configuration for storage, logging and dispatch behavior.
//! - Provide defaults so an empty document is a valid configuration.
//!
//! # Invariants
//! - `dispatch.job.attempts` and `outbox.batch_size` are never zero after
//!   `validate()`.

use crate::logging::default_log_level;
use crate::queue::JobOptions;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// How the "deliver unsent notifications" job reaches the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueStrategy {
    /// Enqueue directly once the transaction commits. A crash between
    /// commit and enqueue leaves notifications unsent.
    #[default]
    AfterCommit,
    /// Write the job to `job_outbox` inside the transaction; a relay hands
    /// it to the queue later.
    Outbox,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub enqueue_strategy: EnqueueStrategy,
    pub job: JobOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Maximum rows relayed per pass.
    pub batch_size: u32,
    /// Relayed rows older than this are pruned.
    pub retention_days: u32,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            retention_days: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` means in-memory.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` disables file logging.
    pub log_dir: Option<String>,
    pub dispatch: DispatchConfig,
    pub outbox: OutboxConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            dispatch: DispatchConfig::default(),
            outbox: OutboxConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.job.attempts == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.job.attempts must be at least 1".to_string(),
            ));
        }
        if self.outbox.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "outbox.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
