//! # study-core
//!
//! Infers study sessions from the access times of documents under a
//! courseware directory and keeps a log of them.
//!
//! ## Design Principles
//!
//! - **Synchronous**: one polling thread, no async runtime.
//! - **Single writer**: only the tracker thread mutates session state; readers
//!   receive owned snapshots through [`SessionTable`].
//! - **Graceful degradation**: unreadable files are skipped, and persistence or
//!   notification failures are logged without stopping the tracker.
//! - **Pluggable seams**: the file source, the log sink and the notifier are
//!   traits, so tests run without touching real access times.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use study_core::{
//!     load_config, notifier_from_settings, FileCatalog, MemorySink, SessionTracker,
//!     DEFAULT_SHUTDOWN_GRACE,
//! };
//!
//! let config = load_config(None)?;
//! let tracker = SessionTracker::new(
//!     config.tracker.clone(),
//!     FileCatalog::new(config.tracker.clone()),
//!     Arc::new(MemorySink::new()),
//!     notifier_from_settings(&config.notifications),
//! );
//! let handle = tracker.start()?;
//! let active = handle.sessions().sorted_snapshot();
//! let report = handle.shutdown(DEFAULT_SHUTDOWN_GRACE);
//! ```

pub mod catalog;
pub mod config;
pub mod entry;
pub mod error;
pub mod notifier;
pub mod report;
pub mod session;
pub mod sink;
pub mod storage;
pub mod tracker;
pub mod users;

pub use catalog::{CatalogSnapshot, CatalogSource, FileCatalog};
pub use config::*;
pub use entry::{subject_for, StudyLogEntry, StudyStatus, COMPLETED_THRESHOLD_MINUTES};
pub use error::{NotifyError, Result, StudyError};
pub use notifier::{
    notifier_from_settings, ConsoleNotifier, EventNotifier, LogNotifier, SilentNotifier,
};
pub use report::{Period, SubjectTotal, SummaryRow};
pub use session::{ActiveSession, SessionTable};
pub use sink::{CsvSink, MemorySink, PersistenceSink, SqliteSink, StudyDb};
pub use storage::StoragePaths;
pub use tracker::{
    CloseOutcome, CloseReason, ClosedSession, PollReport, SessionTracker, ShutdownReport,
    StopSignal, TrackerHandle, DEFAULT_SHUTDOWN_GRACE,
};
pub use users::{Theme, User};
