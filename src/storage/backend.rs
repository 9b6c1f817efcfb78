//! Storage adapter strategy
//!
//! `StorageBackend` is the uniform CRUD surface the local store is built on.
//! A backend is chosen once at startup by `open_backend` and never mixed
//! within one run:
//! - `SqliteBackend` on native platforms
//! - `KeyValueBackend` on the web platform
//! - `UnavailableBackend` when the expected backend could not be opened

use crate::{
    config::{BackendChoice, StorageSettings},
    storage::{
        kv::KeyValueBackend,
        record::{Record, RecordFilter, RecordKind},
        sqlite::SqliteBackend,
    },
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// Conflict policy for `put`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite an existing record with the same key
    Replace,
    /// Fail with `Error::Conflict` if the key already exists
    Reject,
}

/// CRUD capability set shared by every physical backend
pub trait StorageBackend: Send {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Fetch a record by key
    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Record>>;

    /// Fetch all records selected by `filter`, in the filter's order
    fn get_all(&self, filter: &RecordFilter) -> Result<Vec<Record>>;

    /// Write a record under its own key
    fn put(&mut self, record: &Record, mode: WriteMode) -> Result<()>;

    /// Delete a record; returns whether it existed
    fn delete(&mut self, kind: RecordKind, key: &str) -> Result<bool>;
}

/// Platform the process runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Android, iOS, desktop
    Native,
    /// Browser (wasm)
    Web,
}

impl Platform {
    /// Platform of the current build target
    pub fn current() -> Self {
        if cfg!(target_family = "wasm") {
            Platform::Web
        } else {
            Platform::Native
        }
    }
}

/// Open the backend for this run
///
/// A relational backend that fails to open degrades to `UnavailableBackend`
/// instead of failing the caller.
pub fn open_backend(settings: &StorageSettings, platform: Platform) -> Box<dyn StorageBackend> {
    let choice = match settings.backend {
        BackendChoice::Auto => match platform {
            Platform::Native => BackendChoice::Relational,
            Platform::Web => BackendChoice::KeyValue,
        },
        explicit => explicit,
    };

    match choice {
        BackendChoice::KeyValue => match KeyValueBackend::open(&settings.kv_path) {
            Ok(backend) => {
                tracing::info!("Using key/value storage at {}", settings.kv_path.display());
                Box::new(backend)
            }
            Err(e) => {
                tracing::error!("Key/value storage unavailable: {}", e);
                Box::new(UnavailableBackend::new(e.to_string()))
            }
        },
        _ => match SqliteBackend::open(&settings.database_path) {
            Ok(backend) => {
                tracing::info!("Using SQLite storage at {}", settings.database_path.display());
                Box::new(backend)
            }
            Err(e) => {
                tracing::error!("SQLite storage unavailable: {}", e);
                Box::new(UnavailableBackend::new(e.to_string()))
            }
        },
    }
}

/// No-op backend standing in for one that could not be opened
///
/// Every call logs and reports `Error::StorageUnavailable`.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    /// Create an unavailable backend with the reason it could not be opened
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    /// Why the real backend is missing
    pub fn reason(&self) -> &str {
        &self.reason
    }

    fn unavailable<T>(&self, operation: &str) -> Result<T> {
        tracing::warn!("Storage unavailable, skipping {}: {}", operation, self.reason);
        Err(Error::StorageUnavailable(self.reason.clone()))
    }
}

impl StorageBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn get(&self, _kind: RecordKind, _key: &str) -> Result<Option<Record>> {
        self.unavailable("get")
    }

    fn get_all(&self, _filter: &RecordFilter) -> Result<Vec<Record>> {
        self.unavailable("get_all")
    }

    fn put(&mut self, _record: &Record, _mode: WriteMode) -> Result<()> {
        self.unavailable("put")
    }

    fn delete(&mut self, _kind: RecordKind, _key: &str) -> Result<bool> {
        self.unavailable("delete")
    }
}
