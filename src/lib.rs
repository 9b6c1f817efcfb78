//! ReparApp core - session routing and offline storage
//!
//! This library provides the non-presentational core of the ReparApp
//! home-services directory: the authentication session state machine, the
//! navigation graph projection driven by it, and the local store for contact
//! data, favorite providers, and the provider directory.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod navigation;
pub mod profile;
pub mod session;
pub mod storage;

use session::AuthError;

/// Result type alias for ReparApp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ReparApp operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Storage backend missing or its handle could not be created
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A record with the same identifier already exists
    #[error("Conflict: {kind} '{id}' already exists")]
    Conflict {
        /// Record kind that collided
        kind: storage::RecordKind,
        /// Colliding identifier
        id: String,
    },

    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identity provider error
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Remote profile document store error
    #[error("Profile error: {0}")]
    Profile(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl Error {
    /// Whether this error means the storage backend is not usable at all
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Error::StorageUnavailable(_))
    }

    /// Whether this error is an identifier collision
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

/// Tolerance for a missing storage backend.
///
/// Screens treat an unavailable store as "no data yet" rather than a failure.
/// Every other error still propagates.
pub trait OrEmpty<T> {
    /// Map `Error::StorageUnavailable` to `T::default()`
    fn or_empty(self) -> Result<T>;
}

impl<T: Default> OrEmpty<T> for Result<T> {
    fn or_empty(self) -> Result<T> {
        match self {
            Err(Error::StorageUnavailable(reason)) => {
                tracing::debug!("Treating unavailable storage as empty: {}", reason);
                Ok(T::default())
            }
            other => other,
        }
    }
}

/// Initialize the ReparApp library with logging
pub fn init() {
    tracing_subscriber::fmt::init();
}
