//! Typed record operations over a storage backend
//!
//! `LocalStore` owns the three record schemas and is the only surface screens
//! use to read and write local data. Every call completes or fails before it
//! returns; there are no queued writes.

use crate::{
    config::StorageSettings,
    storage::{
        backend::{open_backend, Platform, StorageBackend, WriteMode},
        record::{
            ContactFields, ContactRecord, FavoriteRecord, NewProvider, ProviderRecord,
            ProviderSnapshot, Record, RecordFilter, RecordKind,
        },
        sqlite::SqliteBackend,
    },
    Error, Result,
};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// A provider together with the current user's favorite flag
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderListing {
    /// Directory entry
    pub provider: ProviderRecord,
    /// Whether the user has favorited it
    pub is_favorite: bool,
}

/// Schema-aware local store
///
/// The backend handle is opened once and shared by every caller; calls are
/// serialized through a mutex so the store can be used from any task.
pub struct LocalStore {
    backend: Mutex<Box<dyn StorageBackend>>,
}

impl LocalStore {
    /// Wrap an already opened backend
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    /// Open the backend selected by `settings` for `platform`
    pub fn open(settings: &StorageSettings, platform: Platform) -> Self {
        Self::new(open_backend(settings, platform))
    }

    /// Create a store over a fresh in-memory SQLite database (for testing)
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Box::new(SqliteBackend::open_in_memory()?)))
    }

    /// Name of the active backend
    pub fn backend_name(&self) -> &'static str {
        self.with_backend(|b| Ok(b.name())).unwrap_or("unavailable")
    }

    /// Whether a real backend is active
    pub fn is_available(&self) -> bool {
        self.backend_name() != "unavailable"
    }

    fn with_backend<T>(&self, f: impl FnOnce(&mut dyn StorageBackend) -> Result<T>) -> Result<T> {
        let mut guard = self
            .backend
            .lock()
            .map_err(|_| Error::Storage("Storage handle poisoned".to_string()))?;
        f(guard.as_mut())
    }

    // ========== Contact ==========

    /// Replace the whole contact record of a user
    ///
    /// Fields left unset are stored as null; nothing is merged with the
    /// previous record.
    pub fn upsert_contact(&self, user_id: &str, fields: ContactFields) -> Result<ContactRecord> {
        require_id("user id", user_id)?;

        let record = ContactRecord {
            id: user_id.to_string(),
            fields,
        };
        self.with_backend(|b| b.put(&Record::Contact(record.clone()), WriteMode::Replace))?;
        tracing::debug!("Saved contact data for {}", user_id);

        Ok(record)
    }

    /// Load the contact record of a user
    pub fn get_contact(&self, user_id: &str) -> Result<Option<ContactRecord>> {
        require_id("user id", user_id)?;

        match self.with_backend(|b| b.get(RecordKind::Contact, user_id))? {
            Some(Record::Contact(c)) => Ok(Some(c)),
            Some(other) => Err(unexpected(RecordKind::Contact, &other)),
            None => Ok(None),
        }
    }

    /// Delete the contact record of a user; returns whether one existed
    pub fn delete_contact(&self, user_id: &str) -> Result<bool> {
        require_id("user id", user_id)?;
        self.with_backend(|b| b.delete(RecordKind::Contact, user_id))
    }

    // ========== Favorites ==========

    /// Mark a provider as favorite, timestamped now
    pub fn add_favorite(
        &self,
        user_id: &str,
        provider_id: &str,
        snapshot: &ProviderSnapshot,
    ) -> Result<FavoriteRecord> {
        self.add_favorite_at(user_id, provider_id, snapshot, Utc::now())
    }

    /// Mark a provider as favorite with an explicit timestamp
    ///
    /// Re-adding an existing favorite overwrites it.
    pub fn add_favorite_at(
        &self,
        user_id: &str,
        provider_id: &str,
        snapshot: &ProviderSnapshot,
        created_at: DateTime<Utc>,
    ) -> Result<FavoriteRecord> {
        require_id("user id", user_id)?;
        require_id("provider id", provider_id)?;

        let record = FavoriteRecord {
            id: FavoriteRecord::composite_key(user_id, provider_id),
            provider_id: provider_id.to_string(),
            provider_name: snapshot.name.clone(),
            provider_rating: snapshot.rating,
            services_offered: snapshot.services.clone(),
            user_id: user_id.to_string(),
            created_at,
        };
        self.with_backend(|b| b.put(&Record::Favorite(record.clone()), WriteMode::Replace))?;
        tracing::debug!("Added favorite {} for {}", provider_id, user_id);

        Ok(record)
    }

    /// Remove a favorite; returns whether it existed
    pub fn remove_favorite(&self, user_id: &str, provider_id: &str) -> Result<bool> {
        require_id("user id", user_id)?;
        require_id("provider id", provider_id)?;

        let Some(favorite) = self.get_favorite(user_id, provider_id)? else {
            return Ok(false);
        };
        self.with_backend(|b| b.delete(RecordKind::Favorite, &favorite.id))
    }

    /// Load one favorite
    pub fn get_favorite(&self, user_id: &str, provider_id: &str) -> Result<Option<FavoriteRecord>> {
        require_id("user id", user_id)?;
        require_id("provider id", provider_id)?;

        let key = FavoriteRecord::composite_key(user_id, provider_id);
        match self.with_backend(|b| b.get(RecordKind::Favorite, &key))? {
            // Joined keys can collide ("a_b" + "c" vs "a" + "b_c")
            Some(Record::Favorite(f)) if f.user_id != user_id || f.provider_id != provider_id => {
                Ok(None)
            }
            Some(Record::Favorite(f)) => Ok(Some(f)),
            Some(other) => Err(unexpected(RecordKind::Favorite, &other)),
            None => Ok(None),
        }
    }

    /// Whether the favorite record exists
    pub fn is_favorite(&self, user_id: &str, provider_id: &str) -> Result<bool> {
        Ok(self.get_favorite(user_id, provider_id)?.is_some())
    }

    /// Favorites of a user, most recent first
    pub fn list_favorites(&self, user_id: &str) -> Result<Vec<FavoriteRecord>> {
        require_id("user id", user_id)?;

        let records =
            self.with_backend(|b| b.get_all(&RecordFilter::FavoritesOf(user_id.to_string())))?;
        records
            .into_iter()
            .map(|r| match r {
                Record::Favorite(f) => Ok(f),
                other => Err(unexpected(RecordKind::Favorite, &other)),
            })
            .collect()
    }

    /// Flip the favorite flag of a directory entry
    ///
    /// Returns the new flag.
    pub fn toggle_favorite(&self, user_id: &str, provider: &ProviderRecord) -> Result<bool> {
        if self.is_favorite(user_id, &provider.id)? {
            self.remove_favorite(user_id, &provider.id)?;
            Ok(false)
        } else {
            let snapshot =
                ProviderSnapshot::new(provider.name.clone(), provider.rating, provider.category.clone());
            self.add_favorite(user_id, &provider.id, &snapshot)?;
            Ok(true)
        }
    }

    // ========== Providers ==========

    /// Insert a provider, generating an id when none is supplied
    ///
    /// Fails with `Error::Conflict` when the id is taken; the stored record is
    /// left untouched.
    pub fn add_provider(&self, input: NewProvider) -> Result<ProviderRecord> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Provider name is required".to_string()));
        }
        let category = input.category.trim();
        if category.is_empty() {
            return Err(Error::Validation("Provider category is required".to_string()));
        }

        let id = match input.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let record = ProviderRecord {
            id,
            name: name.to_string(),
            category: category.to_string(),
            phone: non_blank(input.phone),
            email: non_blank(input.email),
            address: non_blank(input.address),
            rating: input.rating,
            rating_count: input.rating_count,
            created_at: Utc::now(),
        };

        match self.with_backend(|b| b.put(&Record::Provider(record.clone()), WriteMode::Reject)) {
            Ok(()) => {
                tracing::info!("Added provider {} ({})", record.name, record.id);
                Ok(record)
            }
            Err(e) => {
                if e.is_conflict() {
                    tracing::warn!("Provider id {} already exists", record.id);
                }
                Err(e)
            }
        }
    }

    /// Load one provider
    pub fn get_provider(&self, provider_id: &str) -> Result<Option<ProviderRecord>> {
        require_id("provider id", provider_id)?;

        match self.with_backend(|b| b.get(RecordKind::Provider, provider_id))? {
            Some(Record::Provider(p)) => Ok(Some(p)),
            Some(other) => Err(unexpected(RecordKind::Provider, &other)),
            None => Ok(None),
        }
    }

    /// Providers ordered by name, optionally restricted to one category
    pub fn list_providers(&self, category: Option<&str>) -> Result<Vec<ProviderRecord>> {
        let filter = RecordFilter::Providers {
            category: category.map(str::to_string),
        };

        let records = self.with_backend(|b| b.get_all(&filter))?;
        records
            .into_iter()
            .map(|r| match r {
                Record::Provider(p) => Ok(p),
                other => Err(unexpected(RecordKind::Provider, &other)),
            })
            .collect()
    }

    /// Delete a provider; returns whether it existed
    pub fn delete_provider(&self, provider_id: &str) -> Result<bool> {
        require_id("provider id", provider_id)?;
        self.with_backend(|b| b.delete(RecordKind::Provider, provider_id))
    }

    /// Providers of a category with the user's favorite flags
    ///
    /// The provider list is loaded first and the flags are read for exactly
    /// that list, so no flag refers to a stale list.
    pub fn provider_listings(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> Result<Vec<ProviderListing>> {
        let providers = self.list_providers(category)?;

        providers
            .into_iter()
            .map(|provider| {
                let is_favorite = self.is_favorite(user_id, &provider.id)?;
                Ok(ProviderListing { provider, is_favorite })
            })
            .collect()
    }
}

fn require_id(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::Validation(format!("A {} is required", what)));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn unexpected(expected: RecordKind, got: &Record) -> Error {
    Error::Storage(format!(
        "Backend returned a {} record where a {} was expected",
        got.kind(),
        expected
    ))
}
