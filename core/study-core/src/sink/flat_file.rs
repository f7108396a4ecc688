//! Flat-file study log: one CSV row per finished session.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::PersistenceSink;
use crate::entry::StudyLogEntry;
use crate::error::{Result, StudyError};

#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvSink {
    /// Creates the file (with header) if it does not exist yet.
    pub fn new(path: PathBuf) -> Result<Self> {
        let sink = Self {
            path,
            write_lock: Mutex::new(()),
        };
        sink.ensure_header()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_header(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent).map_err(StudyError::io("creating log directory"))?;
        }
        if self.is_empty_file()? {
            let mut writer = csv::Writer::from_path(&self.path)
                .map_err(StudyError::csv(format!("creating {}", self.path.display())))?;
            writer
                .write_record(HEADER)
                .map_err(StudyError::csv("writing header"))?;
            writer
                .flush()
                .map_err(StudyError::io("flushing header"))?;
        }
        Ok(())
    }

    fn is_empty_file(&self) -> Result<bool> {
        match fs_err::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(err) => Err(StudyError::Io {
                context: "inspecting study log".to_string(),
                source: err,
            }),
        }
    }
}

const HEADER: [&str; 10] = [
    "filename",
    "subject",
    "duration",
    "status",
    "start_time",
    "end_time",
    "date",
    "week",
    "month",
    "last_access_time",
];

impl PersistenceSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn append(&self, entry: &StudyLogEntry) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // The file may have been removed or truncated since construction.
        self.ensure_header()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(StudyError::io(format!("opening {}", self.path.display())))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(entry)
            .map_err(StudyError::csv("writing study log row"))?;
        writer
            .flush()
            .map_err(StudyError::io("flushing study log"))?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<StudyLogEntry>> {
        if self.is_empty_file()? {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(StudyError::csv(format!("opening {}", self.path.display())))?;
        reader
            .deserialize::<StudyLogEntry>()
            .map(|row| row.map_err(StudyError::csv("decoding study log row")))
            .collect()
    }
}
