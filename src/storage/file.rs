//! File-based review storage for Reprise.
//!
//! Each (learner, node) pair is one JSON document at
//! `<data_dir>/<learner>/<node>.json` holding both the progress record and
//! the queue item. Writes go through temp file + rename, so the two records
//! always land together.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::data_dir;
use crate::core::{validate_id, PairKey, Progress, QueueItem};
use crate::error::{Result, ReviewError};
use crate::storage::{ItemVersion, ReviewStore};

/// Schema version of pair documents.
pub const DOCUMENT_SCHEMA_VERSION: u8 = 1;

/// On-disk document for one pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PairDocument {
    v: u8,
    progress: Option<Progress>,
    item: Option<QueueItem>,
}

impl PairDocument {
    fn empty() -> Self {
        Self {
            v: DOCUMENT_SCHEMA_VERSION,
            progress: None,
            item: None,
        }
    }
}

/// File-based review store.
#[derive(Debug, Clone)]
pub struct FileReviewStore {
    /// Root directory; one subdirectory per learner.
    data_dir: PathBuf,
}

impl FileReviewStore {
    /// Create a store in the default data directory.
    ///
    /// Uses `~/.reprise/data/` or `$REPRISE_HOME/data/`.
    pub fn new() -> Result<Self> {
        let dir = data_dir().ok_or_else(|| {
            ReviewError::config("Could not determine data directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store rooted at a custom directory.
    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();

        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).map_err(|e| ReviewError::storage(&data_dir, e))?;
        }

        Ok(Self { data_dir })
    }

    /// Root directory of the store.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn learner_dir(&self, learner_id: &str) -> PathBuf {
        self.data_dir.join(learner_id)
    }

    /// Path of the document for a pair.
    fn pair_path(&self, key: &PairKey) -> PathBuf {
        self.learner_dir(&key.learner_id)
            .join(format!("{}.json", key.node_id))
    }

    /// Path of the temp file used while writing a pair document.
    fn temp_path(&self, key: &PairKey) -> PathBuf {
        self.learner_dir(&key.learner_id)
            .join(format!(".{}.json.tmp", key.node_id))
    }

    fn read_document(&self, key: &PairKey) -> Result<PairDocument> {
        let path = self.pair_path(key);

        if !path.exists() {
            return Ok(PairDocument::empty());
        }

        load_document(&path)
    }

    /// Write a pair document atomically using temp file + rename.
    fn write_document(&self, key: &PairKey, document: &PairDocument) -> Result<()> {
        let dir = self.learner_dir(&key.learner_id);
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| ReviewError::storage(&dir, e))?;
        }

        let final_path = self.pair_path(key);
        let temp_path = self.temp_path(key);

        let json = serde_json::to_string_pretty(document)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| ReviewError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| ReviewError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| ReviewError::storage(&temp_path, e))?;
        }

        // Rename is atomic on POSIX
        if let Err(e) = fs::rename(&temp_path, &final_path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ReviewError::storage(&final_path, e));
        }

        Ok(())
    }

    /// Read every document for a learner, skipping temp and non-JSON files.
    fn learner_documents(&self, learner_id: &str) -> Result<Vec<PairDocument>> {
        validate_id(learner_id)?;
        let dir = self.learner_dir(learner_id);

        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|e| ReviewError::storage(&dir, e))?;
        let mut documents = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| ReviewError::storage(&dir, e))?;
            let path = entry.path();

            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
            {
                continue;
            }

            documents.push(load_document(&path)?);
        }

        Ok(documents)
    }
}

/// Read and parse one pair document.
fn load_document(path: &Path) -> Result<PairDocument> {
    let content = fs::read_to_string(path).map_err(|e| ReviewError::storage(path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| ReviewError::serde(format!("{}: {}", path.display(), e)))
}

impl ReviewStore for FileReviewStore {
    fn progress(&self, key: &PairKey) -> Result<Option<Progress>> {
        Ok(self.read_document(key)?.progress)
    }

    fn queue_item(&self, key: &PairKey) -> Result<Option<QueueItem>> {
        Ok(self.read_document(key)?.item)
    }

    fn queue_items(&self, learner_id: &str) -> Result<Vec<QueueItem>> {
        Ok(self
            .learner_documents(learner_id)?
            .into_iter()
            .filter_map(|d| d.item)
            .collect())
    }

    fn learner_progress(&self, learner_id: &str) -> Result<Vec<Progress>> {
        Ok(self
            .learner_documents(learner_id)?
            .into_iter()
            .filter_map(|d| d.progress)
            .collect())
    }

    fn save_progress(&self, progress: &Progress) -> Result<()> {
        let key = progress.key();
        let mut document = self.read_document(&key)?;
        document.progress = Some(progress.clone());
        document.v = DOCUMENT_SCHEMA_VERSION;
        self.write_document(&key, &document)
    }

    fn save_pair(
        &self,
        progress: &Progress,
        item: &QueueItem,
        expected: ItemVersion,
    ) -> Result<()> {
        let key = item.key();
        let current = self.read_document(&key)?;

        if !expected.matches(current.item.as_ref()) {
            return Err(key.conflict());
        }

        let document = PairDocument {
            v: DOCUMENT_SCHEMA_VERSION,
            progress: Some(progress.clone()),
            item: Some(item.clone()),
        };
        self.write_document(&key, &document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_review_store_contract;
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    fn create_test_store() -> (FileReviewStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileReviewStore::with_dir(dir.path()).unwrap();
        (store, dir)
    }

    fn key() -> PairKey {
        PairKey::new("ana", "armbar").unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    #[test]
    fn test_file_store_contract() {
        let (store, _dir) = create_test_store();
        test_review_store_contract(&store);
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("data");
        assert!(!data_path.exists());

        let _store = FileReviewStore::with_dir(&data_path).unwrap();

        assert!(data_path.is_dir());
    }

    #[test]
    fn test_pair_path_layout() {
        let (store, dir) = create_test_store();
        let path = store.pair_path(&key());
        assert_eq!(path, dir.path().join("ana").join("armbar.json"));
    }

    #[test]
    fn test_pair_written_as_single_document() {
        let (store, _dir) = create_test_store();
        let key = key();
        let progress = Progress::new(&key, Utc::now());
        let item = QueueItem::new(&key, today(), Utc::now());
        store
            .save_pair(&progress, &item, ItemVersion::Absent)
            .unwrap();

        let content = fs::read_to_string(store.pair_path(&key)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["v"], 1);
        assert_eq!(value["progress"]["node_id"], "armbar");
        assert_eq!(value["item"]["interval_days"], 0);
    }

    #[test]
    fn test_temp_file_cleaned_up() {
        let (store, _dir) = create_test_store();
        let key = key();
        store
            .save_progress(&Progress::new(&key, Utc::now()))
            .unwrap();
        assert!(!store.temp_path(&key).exists());
    }

    #[test]
    fn test_listing_ignores_temp_and_foreign_files() {
        let (store, dir) = create_test_store();
        let key = key();
        store
            .save_pair(
                &Progress::new(&key, Utc::now()),
                &QueueItem::new(&key, today(), Utc::now()),
                ItemVersion::Absent,
            )
            .unwrap();

        let learner_dir = dir.path().join("ana");
        fs::write(learner_dir.join(".half.json.tmp"), "{").unwrap();
        fs::write(learner_dir.join(".hidden.json"), "{").unwrap();
        fs::write(learner_dir.join("notes.txt"), "hello").unwrap();

        let items = store.queue_items("ana").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].node_id, "armbar");
    }

    #[test]
    fn test_listing_fails_on_corrupt_document() {
        let (store, dir) = create_test_store();
        let key = key();
        store
            .save_pair(
                &Progress::new(&key, Utc::now()),
                &QueueItem::new(&key, today(), Utc::now()),
                ItemVersion::Absent,
            )
            .unwrap();

        let broken = dir.path().join("ana").join("broken.json");
        fs::write(&broken, "not json").unwrap();

        let err = store.queue_items("ana").unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("broken.json"));

        let err = store.learner_progress("ana").unwrap_err();
        assert!(err.is_persistence());
    }

    #[test]
    fn test_corrupt_document_is_an_error_on_direct_read() {
        let (store, dir) = create_test_store();
        let learner_dir = dir.path().join("ana");
        fs::create_dir_all(&learner_dir).unwrap();
        fs::write(learner_dir.join("armbar.json"), "not json").unwrap();

        let err = store.queue_item(&key()).unwrap_err();
        assert!(err.is_persistence());
        assert!(err.to_string().contains("armbar.json"));
    }

    #[test]
    fn test_save_progress_preserves_item() {
        let (store, _dir) = create_test_store();
        let key = key();
        let mut progress = Progress::new(&key, Utc::now());
        let item = QueueItem::new(&key, today(), Utc::now());
        store
            .save_pair(&progress, &item, ItemVersion::Absent)
            .unwrap();

        progress.total_reviews = 4;
        store.save_progress(&progress).unwrap();

        assert_eq!(store.queue_item(&key).unwrap().unwrap(), item);
        assert_eq!(store.progress(&key).unwrap().unwrap().total_reviews, 4);
    }

    #[test]
    fn test_invalid_learner_id_rejected_on_listing() {
        let (store, _dir) = create_test_store();
        let err = store.queue_items("../escape").unwrap_err();
        assert!(matches!(err, ReviewError::InvalidId { .. }));
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let key = key();
        {
            let store = FileReviewStore::with_dir(dir.path()).unwrap();
            store
                .save_pair(
                    &Progress::new(&key, Utc::now()),
                    &QueueItem::new(&key, today(), Utc::now()),
                    ItemVersion::Absent,
                )
                .unwrap();
        }

        let reopened = FileReviewStore::with_dir(dir.path()).unwrap();
        assert!(reopened.queue_item(&key).unwrap().is_some());
    }
}
