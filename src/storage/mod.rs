//! Local storage module
//!
//! This module handles the offline data kept for the signed-in user:
//! - Contact data
//! - Favorite providers
//! - Provider directory
//!
//! The module is organized into submodules:
//! - `record` - Record kinds, filters, and their ordering contract
//! - `backend` - Storage adapter trait and one-time backend selection
//! - `sqlite` - Relational backend (native platforms)
//! - `kv` - Key/value backend (web platform)
//! - `local_store` - Typed operations used by screens

// Submodules
pub mod backend;
pub mod kv;
pub mod local_store;
pub mod record;
pub mod sqlite;

// Re-export commonly used types
pub use backend::{open_backend, Platform, StorageBackend, UnavailableBackend, WriteMode};
pub use kv::KeyValueBackend;
pub use local_store::{LocalStore, ProviderListing};
pub use record::{
    ContactFields, ContactRecord, FavoriteRecord, NewProvider, ProviderRecord, ProviderSnapshot,
    Record, RecordFilter, RecordKind,
};
pub use sqlite::SqliteBackend;
