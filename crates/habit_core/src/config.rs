//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe where the habit database and log files live.
//! - Validate settings before any store or logger is started.
//!
//! # Invariants
//! - `db_path` is never empty.
//! - `log_dir`, when set, is absolute.

use crate::logging::{default_log_level, init_logging, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_DB_FILE_NAME: &str = "habit_journey.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_dir: None,
            log_level: default_log_level().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    EmptyDbPath,
    RelativeLogDir(PathBuf),
    InvalidLogLevel(String),
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDbPath => write!(f, "db_path must not be empty"),
            Self::RelativeLogDir(path) => {
                write!(f, "log_dir must be an absolute path, got `{}`", path.display())
            }
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }
        if let Some(log_dir) = &self.log_dir {
            if !log_dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(log_dir.clone()));
            }
        }
        normalize_level(&self.log_level).map_err(ConfigError::InvalidLogLevel)?;
        Ok(())
    }

    /// Validates the config and starts file logging when `log_dir` is set.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let Some(log_dir) = &self.log_dir else {
            return Ok(());
        };
        init_logging(&self.log_level, &log_dir.to_string_lossy()).map_err(ConfigError::Logging)
    }
}
