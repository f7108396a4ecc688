use std::sync::Mutex;

use super::PersistenceSink;
use crate::entry::StudyLogEntry;
use crate::error::Result;

/// Keeps entries in memory. Used by tests and by embedders that persist
/// elsewhere.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<StudyLogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StudyLogEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PersistenceSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn append(&self, entry: &StudyLogEntry) -> Result<()> {
        self.lock().push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> Result<Vec<StudyLogEntry>> {
        Ok(self.lock().clone())
    }
}
