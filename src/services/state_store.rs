//! Durable record of movies that have already been classified
//!
//! A name present in the store is never classified again. The only way to
//! force a re-check is to remove its record from outside the process.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::models::{CheckedRecord, Verdict};

const MARKER_EXTENSION: &str = "checked";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode checked record: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Set of checked movie names with their verdicts.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// True iff a record exists for `name`
    async fn has(&self, name: &str) -> Result<bool, StoreError>;

    /// Persist a record. Writing the same name twice overwrites.
    async fn record(&self, name: &str, verdict: &Verdict) -> Result<(), StoreError>;

    /// Stored record for `name`, if it exists and carries a verdict
    async fn get(&self, name: &str) -> Result<Option<CheckedRecord>, StoreError>;

    /// Number of checked names
    async fn count(&self) -> Result<usize, StoreError>;
}

/// One marker file per movie: `<dir>/<name>.checked`.
///
/// The file holds the JSON encoded [CheckedRecord]. Markers that only contain
/// a timestamp (older state directories) still count as checked.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open the store, creating the directory if needed and verifying it is writable.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let probe = dir.join(".write-probe");
        tokio::fs::write(&probe, b"ok")
            .await
            .map_err(|e| StoreError::io(&probe, e))?;
        tokio::fs::remove_file(&probe)
            .await
            .map_err(|e| StoreError::io(&probe, e))?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn marker_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{MARKER_EXTENSION}"))
    }

    /// Fixed-length temp name, so any name whose marker fits also has a temp file that fits
    fn temp_path(&self, name: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        self.dir.join(format!(".{:016x}.tmp", hasher.finish()))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn has(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.marker_path(name);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }

    async fn record(&self, name: &str, verdict: &Verdict) -> Result<(), StoreError> {
        let record = CheckedRecord {
            name: name.to_string(),
            verdict: verdict.clone(),
        };
        let body = serde_json::to_vec(&record)?;

        // Write then rename so a crash never leaves a truncated marker
        let temp = self.temp_path(name);
        let target = self.marker_path(name);
        tokio::fs::write(&temp, &body)
            .await
            .map_err(|e| StoreError::io(&temp, e))?;
        tokio::fs::rename(&temp, &target)
            .await
            .map_err(|e| StoreError::io(&target, e))?;

        debug!(movie = %name, is_match = verdict.is_match, "Marked movie as checked");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<CheckedRecord>, StoreError> {
        let path = self.marker_path(name);
        let body = match tokio::fs::read_to_string(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        match serde_json::from_str(&body) {
            Ok(record) => Ok(Some(record)),
            Err(_) => {
                warn!(movie = %name, "Marker has no verdict (legacy format)");
                Ok(None)
            }
        }
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;

        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let path = entry.path();
            let is_marker = path.extension().and_then(|e| e.to_str()) == Some(MARKER_EXTENSION);
            let is_temp = entry.file_name().to_string_lossy().starts_with('.');
            if is_marker && !is_temp {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// In-memory store for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: RwLock<HashMap<String, CheckedRecord>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record
    pub fn records(&self) -> HashMap<String, CheckedRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn has(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.records.read().contains_key(name))
    }

    async fn record(&self, name: &str, verdict: &Verdict) -> Result<(), StoreError> {
        self.records.write().insert(
            name.to_string(),
            CheckedRecord {
                name: name.to_string(),
                verdict: verdict.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<CheckedRecord>, StoreError> {
        Ok(self.records.read().get(name).cloned())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_record_then_has() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();

        assert!(!store.has("Pathaan.2023").await.unwrap());
        store
            .record("Pathaan.2023", &Verdict::new(true, "yes"))
            .await
            .unwrap();
        assert!(store.has("Pathaan.2023").await.unwrap());
        assert!(dir.path().join("Pathaan.2023.checked").exists());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStateStore::open(dir.path()).await.unwrap();
            store
                .record("Inception.2010", &Verdict::new(false, "No."))
                .await
                .unwrap();
        }

        let store = FileStateStore::open(dir.path()).await.unwrap();
        let record = store.get("Inception.2010").await.unwrap().unwrap();
        assert_eq!(record.name, "Inception.2010");
        assert!(!record.verdict.is_match);
        assert_eq!(record.verdict.raw_response, "No.");
    }

    #[tokio::test]
    async fn test_overwrite_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();

        store.record("RRR", &Verdict::new(true, "yes")).await.unwrap();
        store.record("RRR", &Verdict::new(true, "yes")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_legacy_marker_counts_as_checked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Lagaan.checked"), "1717171717.123").unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();

        assert!(store.has("Lagaan").await.unwrap());
        assert!(store.get("Lagaan").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), "").unwrap();
        std::fs::write(dir.path().join(".Dangal.checked.tmp"), "").unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();
        store.record("Dangal", &Verdict::new(true, "yes")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_name_near_filename_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::open(dir.path()).await.unwrap();
        // 245 bytes plus ".checked" still fits in a 255 byte file name
        let name = "A".repeat(245);

        store.record(&name, &Verdict::new(true, "yes")).await.unwrap();

        assert!(store.has(&name).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 1);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state").join("checked");
        let store = FileStateStore::open(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStateStore::new();
        store.record("a", &Verdict::new(false, "no")).await.unwrap();
        assert!(store.has("a").await.unwrap());
        assert!(!store.has("b").await.unwrap());
        assert_eq!(store.records().len(), 1);
    }
}
