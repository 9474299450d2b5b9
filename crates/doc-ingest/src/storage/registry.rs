//! JSON-backed file registry

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::types::FileRecord;

/// File records keyed by id, written through to a JSON file on every change
pub struct FileRegistry {
    records: DashMap<Uuid, FileRecord>,
    path: PathBuf,
    /// Serializes writes of the registry file
    write_lock: Mutex<()>,
}

impl FileRegistry {
    /// Open a registry, loading any records already persisted at `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = Self::load_records(&path);
        tracing::info!("Loaded {} file records from {}", records.len(), path.display());
        Self {
            records,
            path,
            write_lock: Mutex::new(()),
        }
    }

    fn load_records(path: &Path) -> DashMap<Uuid, FileRecord> {
        let records = DashMap::new();

        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<Vec<FileRecord>>(&content) {
                    Ok(list) => {
                        for record in list {
                            records.insert(record.id, record);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to parse {}: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("Failed to read {}: {}", path.display(), e),
            }
        }

        records
    }

    fn save(&self) {
        let _guard = self.write_lock.lock();
        let list = self.list();

        match serde_json::to_string_pretty(&list) {
            Ok(content) => {
                if let Some(parent) = self.path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        tracing::error!("Failed to create {}: {}", parent.display(), e);
                        return;
                    }
                }
                if let Err(e) = fs::write(&self.path, content) {
                    tracing::error!("Failed to save {}: {}", self.path.display(), e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize file records: {}", e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&self, record: FileRecord) {
        self.records.insert(record.id, record);
        self.save();
    }

    pub fn get(&self, id: &Uuid) -> Option<FileRecord> {
        self.records.get(id).map(|r| r.clone())
    }

    /// All records, oldest first
    pub fn list(&self) -> Vec<FileRecord> {
        let mut list: Vec<FileRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        list
    }

    pub fn remove(&self, id: &Uuid) -> Option<FileRecord> {
        let removed = self.records.remove(id).map(|(_, r)| r);
        if removed.is_some() {
            self.save();
        }
        removed
    }

    /// Remove every record, returning how many were dropped
    pub fn clear(&self) -> usize {
        let count = self.records.len();
        self.records.clear();
        self.save();
        count
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileMeta;
    use tempfile::tempdir;

    fn record(name: &str) -> FileRecord {
        let id = Uuid::new_v4();
        FileRecord::new(
            id,
            "user-1",
            format!("{}_{}", id, name),
            FileMeta {
                name: name.to_string(),
                content_type: Some("text/plain".to_string()),
                size: 5,
                path: format!("/tmp/{}_{}", id, name),
                original_path: None,
            },
        )
    }

    #[test]
    fn test_insert_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("files.json");

        let registry = FileRegistry::open(&path);
        assert!(registry.is_empty());
        let first = record("a.txt");
        let second = record("b.txt");
        registry.insert(first.clone());
        registry.insert(second.clone());

        let reopened = FileRegistry::open(&path);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(&first.id), Some(first));
        assert_eq!(reopened.get(&second.id), Some(second));
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempdir().unwrap();
        let registry = FileRegistry::open(dir.path().join("files.json"));
        let first = record("a.txt");
        registry.insert(first.clone());
        registry.insert(record("b.txt"));

        assert_eq!(registry.remove(&first.id).map(|r| r.id), Some(first.id));
        assert!(registry.remove(&first.id).is_none());
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.clear(), 1);
        assert!(FileRegistry::open(registry.path()).is_empty());
    }

    #[test]
    fn test_corrupt_registry_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("files.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileRegistry::open(&path).is_empty());
    }
}
