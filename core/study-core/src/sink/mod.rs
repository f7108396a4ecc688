//! Persistence sinks for finished study sessions.
//!
//! The tracker only needs `append`. Reporting consumers read back through
//! `entries` and the aggregate queries, which sinks may override with
//! something faster than a full load.

mod flat_file;
mod memory;
mod sqlite;

pub use flat_file::CsvSink;
pub use memory::MemorySink;
pub use sqlite::{SqliteSink, StudyDb};

use crate::entry::StudyLogEntry;
use crate::error::Result;
use crate::report::{self, Period, SubjectTotal, SummaryRow};

/// Durable, appendable store of [`StudyLogEntry`] rows.
///
/// Implementors must tolerate concurrent callers: the tracker thread appends
/// while a reporting thread reads.
pub trait PersistenceSink: Send + Sync {
    /// Short backend name for logs (e.g. "sqlite", "csv").
    fn name(&self) -> &'static str;

    fn append(&self, entry: &StudyLogEntry) -> Result<()>;

    /// All entries in insertion order.
    fn entries(&self) -> Result<Vec<StudyLogEntry>>;

    /// Total minutes per (period, subject).
    fn summarize(&self, period: Period) -> Result<Vec<SummaryRow>> {
        Ok(report::summarize(&self.entries()?, period))
    }

    /// Total minutes per subject, largest first.
    fn subject_totals(&self) -> Result<Vec<SubjectTotal>> {
        Ok(report::subject_totals(&self.entries()?))
    }
}
