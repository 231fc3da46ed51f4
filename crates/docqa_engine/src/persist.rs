use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use docqa_core::{QaItem, HISTORY_LIMIT};
use docqa_logging::{docqa_info, docqa_warn};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::lock;

/// File name under which the question history is stored.
pub const HISTORY_KEY: &str = "docqa.qa_history.ron";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("could not encode history: {0}")]
    Encode(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Durable home of the question history.
pub trait HistoryStore: Send + Sync {
    /// Newest first. Unreadable storage yields an empty history.
    fn load(&self) -> Vec<QaItem>;

    /// Replaces the stored history with at most [`HISTORY_LIMIT`] items.
    fn save(&self, items: &[QaItem]) -> Result<(), PersistError>;
}

/// RON file named [`HISTORY_KEY`] inside a data directory.
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(HISTORY_KEY)
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Vec<QaItem> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Vec::new();
            }
            Err(err) => {
                docqa_warn!("Failed to read history from {:?}: {}", path, err);
                return Vec::new();
            }
        };

        let mut items: Vec<QaItem> = match ron::from_str(&content) {
            Ok(items) => items,
            Err(err) => {
                docqa_warn!("Failed to parse history from {:?}: {}", path, err);
                return Vec::new();
            }
        };
        items.truncate(HISTORY_LIMIT);

        docqa_info!("Loaded {} history item(s) from {:?}", items.len(), path);
        items
    }

    fn save(&self, items: &[QaItem]) -> Result<(), PersistError> {
        let kept = &items[..items.len().min(HISTORY_LIMIT)];
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(&kept, pretty)
            .map_err(|err| PersistError::Encode(err.to_string()))?;

        AtomicFileWriter::new(self.dir.clone()).write(HISTORY_KEY, &content)?;
        Ok(())
    }
}

/// Keeps the history in memory only; nothing survives the process.
#[derive(Default)]
pub struct MemoryHistoryStore {
    items: Mutex<Vec<QaItem>>,
}

impl MemoryHistoryStore {
    pub fn new(items: Vec<QaItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    pub fn snapshot(&self) -> Vec<QaItem> {
        lock(&self.items).clone()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Vec<QaItem> {
        let mut items = self.snapshot();
        items.truncate(HISTORY_LIMIT);
        items
    }

    fn save(&self, items: &[QaItem]) -> Result<(), PersistError> {
        *lock(&self.items) = items.iter().take(HISTORY_LIMIT).cloned().collect();
        Ok(())
    }
}
