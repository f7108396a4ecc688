//! File discovery and access-time snapshots.
//!
//! A snapshot is a plain map from path to last access time. The tracker
//! compares consecutive snapshots; the catalog itself keeps no state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::config::TrackerConfig;

pub type CatalogSnapshot = HashMap<PathBuf, SystemTime>;

/// Source of access-time snapshots polled by the tracker.
pub trait CatalogSource: Send {
    /// Returns the current access time of every tracked file.
    /// Must not fail: unreadable entries are left out of the snapshot.
    fn scan(&self) -> CatalogSnapshot;
}

/// Walks a directory tree and reads access times from file metadata.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    config: TrackerConfig,
}

impl FileCatalog {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }
}

impl CatalogSource for FileCatalog {
    fn scan(&self) -> CatalogSnapshot {
        let mut snapshot = HashMap::new();

        for entry in WalkDir::new(&self.config.root_dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::trace!(error = %err, "Skipping unreadable catalog entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.config.is_supported(entry.path()) {
                continue;
            }

            // Files can vanish between listing and stat; they count as absent.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::trace!(
                        path = %entry.path().display(),
                        error = %err,
                        "Metadata unavailable"
                    );
                    continue;
                }
            };
            match metadata.accessed() {
                Ok(accessed) => {
                    snapshot.insert(entry.into_path(), accessed);
                }
                Err(err) => {
                    tracing::trace!(
                        path = %entry.path().display(),
                        error = %err,
                        "Access time unavailable"
                    );
                }
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File, FileTimes};
    use std::path::Path;
    use std::time::Duration;

    fn touch(path: &Path, accessed_secs: u64) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        let file = File::create(path).expect("create");
        let accessed = SystemTime::UNIX_EPOCH + Duration::from_secs(accessed_secs);
        file.set_times(FileTimes::new().set_accessed(accessed))
            .expect("set atime");
    }

    #[test]
    fn scan_collects_supported_files_recursively() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let root = temp_dir.path();
        touch(&root.join("Math/chapter1.pdf"), 1000);
        touch(&root.join("Physics/optics/lecture.PPTX"), 2000);
        touch(&root.join("History/essay.docx"), 3000);
        touch(&root.join("History/notes.txt"), 4000);

        let catalog = FileCatalog::new(TrackerConfig::for_root(root));
        let snapshot = catalog.scan();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.get(&root.join("Math/chapter1.pdf")),
            Some(&(SystemTime::UNIX_EPOCH + Duration::from_secs(1000)))
        );
        assert!(snapshot.contains_key(&root.join("Physics/optics/lecture.PPTX")));
        assert!(!snapshot.contains_key(&root.join("History/notes.txt")));
    }

    #[test]
    fn scan_of_missing_root_is_empty() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let catalog = FileCatalog::new(TrackerConfig::for_root(temp_dir.path().join("gone")));
        assert!(catalog.scan().is_empty());
    }

    #[test]
    fn scan_skips_directories_named_like_documents() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("archive.pdf")).expect("mkdir");
        touch(&root.join("archive.pdf/inner.pdf"), 10);

        let snapshot = FileCatalog::new(TrackerConfig::for_root(root)).scan();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&root.join("archive.pdf/inner.pdf")));
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_dangling_links_and_keeps_going() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("missing.pdf"), root.join("broken.pdf"))
            .expect("symlink");
        touch(&root.join("Math/chapter1.pdf"), 1000);

        let snapshot = FileCatalog::new(TrackerConfig::for_root(root)).scan();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&root.join("Math/chapter1.pdf")));
    }
}
