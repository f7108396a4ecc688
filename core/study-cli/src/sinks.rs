//! Config resolution and sink construction shared by the subcommands.

use std::path::PathBuf;
use std::sync::Arc;
use study_core::{
    load_config, CsvSink, PersistenceSink, SqliteSink, StorageBackend, StudyConfig, StudyDb,
    StudyError,
};

use crate::StorageArgs;

pub fn parse_backend(value: &str) -> Result<StorageBackend, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "sqlite" | "db" => Ok(StorageBackend::Sqlite),
        "csv" => Ok(StorageBackend::Csv),
        other => Err(format!("unknown backend '{other}' (expected sqlite or csv)")),
    }
}

/// Loads the config file and applies command-line overrides.
pub fn effective_config(
    config_path: Option<PathBuf>,
    storage: &StorageArgs,
) -> Result<StudyConfig, StudyError> {
    let mut config = load_config(config_path)?;
    if let Some(backend) = storage.backend {
        config.storage.backend = backend;
    }
    Ok(config)
}

/// Opens the configured sink. A username scopes SQLite rows to that user and
/// must already be registered.
pub fn open_sink(
    config: &StudyConfig,
    username: Option<&str>,
) -> Result<Arc<dyn PersistenceSink>, StudyError> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let db = StudyDb::new(config.storage.sqlite_path.clone())?;
            let user_id = match username {
                Some(name) => Some(
                    db.login_user(name)?
                        .ok_or_else(|| StudyError::UserNotFound(name.to_string()))?
                        .id,
                ),
                None => None,
            };
            tracing::debug!(
                path = %config.storage.sqlite_path.display(),
                user_id = ?user_id,
                "Opened SQLite study log"
            );
            Ok(Arc::new(SqliteSink::new(db, user_id)))
        }
        StorageBackend::Csv => {
            if let Some(name) = username {
                tracing::warn!(username = %name, "CSV log has no user column; logging unattributed");
            }
            let sink = CsvSink::new(config.storage.csv_path.clone())?;
            tracing::debug!(path = %sink.path().display(), "Opened CSV study log");
            Ok(Arc::new(sink))
        }
    }
}

pub fn show_config(config_path: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(config_path)?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|err| format!("Failed to render config: {err}"))?;
    print!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::{StoragePaths, StorageSettings};

    fn config_in(dir: &std::path::Path, backend: StorageBackend) -> StudyConfig {
        StudyConfig {
            storage: StorageSettings {
                backend,
                ..StorageSettings::with_paths(&StoragePaths::with_root(dir.to_path_buf()))
            },
            ..StudyConfig::default()
        }
    }

    #[test]
    fn parse_backend_accepts_known_names() {
        assert_eq!(parse_backend("SQLite"), Ok(StorageBackend::Sqlite));
        assert_eq!(parse_backend("csv"), Ok(StorageBackend::Csv));
        assert!(parse_backend("parquet").is_err());
    }

    #[test]
    fn backend_override_wins_over_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[storage]\nbackend = \"sqlite\"\n").expect("write");

        let config = effective_config(
            Some(path),
            &StorageArgs {
                user: None,
                backend: Some(StorageBackend::Csv),
            },
        )
        .expect("config");
        assert_eq!(config.storage.backend, StorageBackend::Csv);
    }

    #[test]
    fn sqlite_sink_requires_registered_user() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = config_in(temp_dir.path(), StorageBackend::Sqlite);

        let err = open_sink(&config, Some("ghost")).err().expect("unknown user");
        assert!(matches!(err, StudyError::UserNotFound(name) if name == "ghost"));

        StudyDb::new(config.storage.sqlite_path.clone())
            .expect("db")
            .register_user("alice", None)
            .expect("register");
        let sink = open_sink(&config, Some("alice")).expect("sink");
        assert_eq!(sink.name(), "sqlite");
    }

    #[test]
    fn csv_sink_ignores_user() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = config_in(temp_dir.path(), StorageBackend::Csv);

        let sink = open_sink(&config, Some("alice")).expect("sink");
        assert_eq!(sink.name(), "csv");
        assert!(config.storage.csv_path.exists());
    }
}
