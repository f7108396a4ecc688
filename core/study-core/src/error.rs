//! Error types for study-core operations.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// Core Error
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur in study-core operations.
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // ─────────────────────────────────────────────────────────────────────
    // User Directory Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ─────────────────────────────────────────────────────────────────────
    // Storage Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Database error: {context}: {source}")]
    Sqlite {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("CSV error: {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl StudyError {
    pub(crate) fn sqlite(context: impl Into<String>) -> impl FnOnce(rusqlite::Error) -> Self {
        let context = context.into();
        move |source| StudyError::Sqlite { context, source }
    }

    pub(crate) fn csv(context: impl Into<String>) -> impl FnOnce(csv::Error) -> Self {
        let context = context.into();
        move |source| StudyError::Csv { context, source }
    }

    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| StudyError::Io { context, source }
    }
}

/// Convenience type alias for Results using StudyError.
pub type Result<T> = std::result::Result<T, StudyError>;

impl From<StudyError> for String {
    fn from(err: StudyError) -> String {
        err.to_string()
    }
}

/// Delivery failure reported by an [`EventNotifier`](crate::notifier::EventNotifier).
///
/// Kept apart from [`StudyError`]: notification is best-effort and callers
/// only ever log it.
#[derive(Debug, thiserror::Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);
