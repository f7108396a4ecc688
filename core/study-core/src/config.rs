//! Configuration loading for the tracker, storage and notifications.
//!
//! The config file is optional: a missing file yields defaults, a malformed
//! one is an error. Values are validated once at load time and then passed
//! around as an immutable [`StudyConfig`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, StudyError};
use crate::storage::{expand_tilde, StoragePaths};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_LEARNING_THRESHOLD_MINUTES: f64 = 0.01;
pub const DEFAULT_INACTIVITY_THRESHOLD_SECS: u64 = 300;
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["pdf", "docx", "pptx"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct StudyConfig {
    pub tracker: TrackerConfig,
    pub storage: StorageSettings,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Root of the monitored tree.
    pub root_dir: PathBuf,
    pub poll_interval_secs: u64,
    /// Sessions shorter than this (minutes) are discarded, not persisted.
    pub learning_threshold_minutes: f64,
    /// Maximum gap without a fluctuation before a session is closed.
    pub inactivity_threshold_secs: u64,
    /// Extensions without the leading dot, matched case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let root_dir = dirs::home_dir()
            .map(|home| home.join("courseware"))
            .unwrap_or_else(|| PathBuf::from("courseware"));
        Self {
            root_dir,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            learning_threshold_minutes: DEFAULT_LEARNING_THRESHOLD_MINUTES,
            inactivity_threshold_secs: DEFAULT_INACTIVITY_THRESHOLD_SECS,
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }
}

impl TrackerConfig {
    /// Config rooted at `root_dir` with every other value at its default.
    pub fn for_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Saturates at `chrono::Duration::MAX`; `validate` rejects such values.
    pub fn inactivity_threshold(&self) -> chrono::Duration {
        seconds_delta(self.inactivity_threshold_secs).unwrap_or(chrono::Duration::MAX)
    }

    /// Returns true when `path` carries one of the supported extensions.
    pub fn is_supported(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(StudyError::ConfigInvalid(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if !self.learning_threshold_minutes.is_finite() || self.learning_threshold_minutes < 0.0 {
            return Err(StudyError::ConfigInvalid(format!(
                "learning_threshold_minutes must be a non-negative number, got {}",
                self.learning_threshold_minutes
            )));
        }
        if seconds_delta(self.inactivity_threshold_secs).is_none() {
            return Err(StudyError::ConfigInvalid(format!(
                "inactivity_threshold_secs is out of range, got {}",
                self.inactivity_threshold_secs
            )));
        }
        if self
            .extensions
            .iter()
            .all(|ext| ext.trim_start_matches('.').is_empty())
        {
            return Err(StudyError::ConfigInvalid(
                "extensions must name at least one file type".to_string(),
            ));
        }
        Ok(())
    }
}

fn seconds_delta(secs: u64) -> Option<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub sqlite_path: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self::with_paths(&StoragePaths::default())
    }
}

impl StorageSettings {
    pub fn with_paths(paths: &StoragePaths) -> Self {
        Self {
            backend: StorageBackend::default(),
            sqlite_path: paths.database_file(),
            csv_path: paths.csv_log_file(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    #[default]
    Log,
    Console,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub mode: NotificationMode,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: NotificationMode::default(),
        }
    }
}

impl StudyConfig {
    /// Expands `~` in every configured path.
    pub fn resolve_paths(mut self) -> Self {
        self.tracker.root_dir = expand_tilde(&self.tracker.root_dir);
        self.storage.sqlite_path = expand_tilde(&self.storage.sqlite_path);
        self.storage.csv_path = expand_tilde(&self.storage.csv_path);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.tracker.validate()
    }
}

/// Loads the config from `path`, or from the default location when `None`.
///
/// A missing file is not an error; defaults are returned instead.
pub fn load_config(path: Option<PathBuf>) -> Result<StudyConfig> {
    let config_path = path.unwrap_or_else(|| StoragePaths::default().config_file());

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "Config file missing; using defaults");
        return Ok(StudyConfig::default().resolve_paths());
    }

    let content = fs_err::read_to_string(&config_path)
        .map_err(StudyError::io(format!("reading {}", config_path.display())))?;
    let config = toml::from_str::<StudyConfig>(&content)
        .map_err(|err| StudyError::ConfigMalformed {
            path: config_path.clone(),
            details: err.to_string(),
        })?
        .resolve_paths();
    config.validate()?;
    Ok(config)
}
