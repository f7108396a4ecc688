//! Storage path management for the study tracker.
//!
//! All default file locations live here so the CLI, the sinks and the
//! config loader agree on where things go. Tests inject a temp root with
//! [`StoragePaths::with_root`].

use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = ".study-tracker";

/// Central configuration for all study-tracker storage paths.
///
/// Production code uses `StoragePaths::default()` which points to
/// `~/.study-tracker/`. When no home directory can be resolved the paths are
/// relative to the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        let root = dirs::home_dir()
            .map(|home| home.join(DATA_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME));
        Self { root }
    }
}

impl StoragePaths {
    /// Creates a StoragePaths with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the TOML configuration file.
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to the SQLite database backing the relational sink and users.
    pub fn database_file(&self) -> PathBuf {
        self.root.join("study_tracker.db")
    }

    /// Path to the flat-file study log.
    pub fn csv_log_file(&self) -> PathBuf {
        self.root.join("study_log.csv")
    }

    /// Directory for rolling tracing logs.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

/// Expands a leading `~` to the user's home directory.
///
/// Paths without a leading tilde, or when no home directory is known, are
/// returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_root_derives_all_paths() {
        let paths = StoragePaths::with_root(PathBuf::from("/tmp/st"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/st/config.toml"));
        assert_eq!(
            paths.database_file(),
            PathBuf::from("/tmp/st/study_tracker.db")
        );
        assert_eq!(paths.csv_log_file(), PathBuf::from("/tmp/st/study_log.csv"));
        assert_eq!(paths.logs_dir(), PathBuf::from("/tmp/st/logs"));
    }

    #[test]
    fn expand_tilde_leaves_absolute_paths_alone() {
        let path = Path::new("/var/data/notes");
        assert_eq!(expand_tilde(path), PathBuf::from("/var/data/notes"));
    }

    #[test]
    fn expand_tilde_replaces_home_prefix() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_tilde(Path::new("~/notes")), home.join("notes"));
        assert_eq!(expand_tilde(Path::new("~notes")), PathBuf::from("~notes"));
    }
}
