//! Tracing setup: human-readable events on stderr plus a daily rolling file.
//!
//! Stdout is left to command output and the interactive menu.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILTER_ENV: &str = "STUDY_TRACKER_LOG";
const LOG_FILE_PREFIX: &str = "study-tracker";

/// Installs the global subscriber. Keep the returned guard alive for the
/// life of the process so buffered file output is flushed on exit.
pub fn init(logs_dir: &Path) -> Option<WorkerGuard> {
    let file_appender = fs_err::create_dir_all(logs_dir)
        .map_err(|err| err.to_string())
        .and_then(|()| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(LOG_FILE_PREFIX)
                .filename_suffix("log")
                .build(logs_dir)
                .map_err(|err| err.to_string())
        });

    let (file_layer, guard, file_error) = match file_appender {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard), None)
        }
        Err(err) => (None, None, Some(err)),
    };

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    if let Some(err) = file_error {
        tracing::warn!(
            error = %err,
            dir = %logs_dir.display(),
            "File logging disabled"
        );
    }
    guard
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
