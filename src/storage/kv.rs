//! Key/value storage backend
//!
//! Backend used on the web platform. Every record is stored as an opaque JSON
//! blob under a namespaced key (`"<kind>_<id>"`). The map can be persisted to a
//! JSON file, which is rewritten after every mutation. A mutation whose file
//! write fails is rolled back in memory.

use crate::{
    storage::{
        backend::{StorageBackend, WriteMode},
        record::{ContactRecord, FavoriteRecord, ProviderRecord, Record, RecordFilter, RecordKind},
    },
    Error, Result,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key/value storage backend
#[derive(Debug, Default)]
pub struct KeyValueBackend {
    entries: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl KeyValueBackend {
    /// Create a volatile in-memory store (for testing)
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store persisted to a JSON file
    ///
    /// A missing or empty file starts an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let entries = if path.exists() {
            let data = std::fs::read_to_string(path).map_err(|e| {
                Error::StorageUnavailable(format!("Failed to read key/value store: {}", e))
            })?;
            if data.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&data).map_err(|e| {
                    Error::StorageUnavailable(format!("Failed to parse key/value store: {}", e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            entries,
            path: Some(path.to_path_buf()),
        })
    }

    /// Number of stored entries across all kinds
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Storage(format!("Failed to create store directory: {}", e)))?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)
            .map_err(|e| Error::Storage(format!("Failed to write key/value store: {}", e)))?;
        Ok(())
    }

    fn encode(record: &Record) -> Result<String> {
        let blob = match record {
            Record::Contact(c) => serde_json::to_string(c)?,
            Record::Favorite(f) => serde_json::to_string(f)?,
            Record::Provider(p) => serde_json::to_string(p)?,
        };
        Ok(blob)
    }

    fn decode(kind: RecordKind, blob: &str) -> Result<Record> {
        let record = match kind {
            RecordKind::Contact => Record::Contact(serde_json::from_str::<ContactRecord>(blob)?),
            RecordKind::Favorite => Record::Favorite(serde_json::from_str::<FavoriteRecord>(blob)?),
            RecordKind::Provider => Record::Provider(serde_json::from_str::<ProviderRecord>(blob)?),
        };
        Ok(record)
    }
}

impl StorageBackend for KeyValueBackend {
    fn name(&self) -> &'static str {
        "key_value"
    }

    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Record>> {
        self.entries
            .get(&kind.namespaced_key(key))
            .map(|blob| Self::decode(kind, blob))
            .transpose()
    }

    fn get_all(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let kind = filter.kind();
        let prefix = kind.namespaced_key("");

        let mut records = Vec::new();
        for (key, blob) in self.entries.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            let record = Self::decode(kind, blob)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }

        filter.sort(&mut records);
        Ok(records)
    }

    fn put(&mut self, record: &Record, mode: WriteMode) -> Result<()> {
        let key = record.kind().namespaced_key(record.key());

        if mode == WriteMode::Reject && self.entries.contains_key(&key) {
            return Err(Error::Conflict {
                kind: record.kind(),
                id: record.key().to_string(),
            });
        }

        let blob = Self::encode(record)?;
        let previous = self.entries.insert(key.clone(), blob);
        if let Err(e) = self.flush() {
            match previous {
                Some(blob) => self.entries.insert(key, blob),
                None => self.entries.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&mut self, kind: RecordKind, key: &str) -> Result<bool> {
        let key = kind.namespaced_key(key);
        let Some(previous) = self.entries.remove(&key) else {
            return Ok(false);
        };

        if let Err(e) = self.flush() {
            self.entries.insert(key, previous);
            return Err(e);
        }
        Ok(true)
    }
}
