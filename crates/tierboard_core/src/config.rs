//! Board configuration file.
//!
//! # Responsibility
//! - Load the TOML file naming the database, log settings and seeding.
//!
//! # Invariants
//! - An absent file is not an error; callers fall back to defaults.
//! - Relative `db_path` and `log_dir` resolve against the config file's
//!   directory.

use crate::logging::{default_log_level, normalize_level};
use crate::service::board_service::BoardOptions;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "tierboard.sqlite3";

/// Errors while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config file at {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config file at {}: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

fn default_seed() -> bool {
    true
}

/// Board configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoardConfig {
    /// SQLite file holding the board.
    pub db_path: PathBuf,
    /// One of `trace|debug|info|warn|error`.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling logs; logging stays off when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_seed")]
    pub seed_default_tiers: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: None,
            log_dir: None,
            seed_default_tiers: true,
        }
    }
}

impl BoardConfig {
    /// Loads config from `path`, returning `Ok(None)` when it does not exist.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: BoardConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(level) = &config.log_level {
            normalize_level(level).map_err(ConfigError::Invalid)?;
        }
        if let Some(base) = path.parent() {
            if config.db_path.is_relative() {
                config.db_path = base.join(&config.db_path);
            }
            if let Some(log_dir) = config.log_dir.take() {
                config.log_dir = Some(if log_dir.is_relative() {
                    base.join(log_dir)
                } else {
                    log_dir
                });
            }
        }
        Ok(Some(config))
    }

    /// Effective log level after defaults.
    pub fn effective_log_level(&self) -> &str {
        match &self.log_level {
            Some(level) => level.as_str(),
            None => default_log_level(),
        }
    }

    pub fn board_options(&self) -> BoardOptions {
        BoardOptions {
            seed_default_tiers: self.seed_default_tiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardConfig, ConfigError};
    use std::fs;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = BoardConfig::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierboard.toml");
        fs::write(&path, "db_path = \"data/board.sqlite3\"\nlog_dir = \"logs\"\n").unwrap();

        let config = BoardConfig::load_from_path(&path).unwrap().unwrap();
        assert_eq!(config.db_path, dir.path().join("data/board.sqlite3"));
        assert_eq!(config.log_dir, Some(dir.path().join("logs")));
        assert!(config.seed_default_tiers);
    }

    #[test]
    fn unknown_log_level_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierboard.toml");
        fs::write(&path, "db_path = \"b.sqlite3\"\nlog_level = \"loud\"\n").unwrap();

        let err = BoardConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref message) if message.contains("loud")));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierboard.toml");
        fs::write(&path, "db_path = [").unwrap();

        let err = BoardConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn seeding_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierboard.toml");
        fs::write(&path, "db_path = \"b.sqlite3\"\nseed_default_tiers = false\n").unwrap();

        let config = BoardConfig::load_from_path(&path).unwrap().unwrap();
        assert!(!config.board_options().seed_default_tiers);
        assert_eq!(config.effective_log_level(), super::default_log_level());
    }

    #[test]
    fn configured_log_level_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierboard.toml");
        fs::write(&path, "db_path = \"b.sqlite3\"\nlog_level = \"warn\"\n").unwrap();

        let config = BoardConfig::load_from_path(&path).unwrap().unwrap();
        assert_eq!(config.effective_log_level(), "warn");
        assert_eq!(BoardConfig::default().effective_log_level(), super::default_log_level());
    }
}
