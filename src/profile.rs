//! Displayable user profile kept in the remote document store
//!
//! The document store is a cache of what other screens display about a user
//! (name, phone, photo). It is separate from the local contact record and is
//! never authoritative for the contact form.

use crate::{session::Identity, Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Profile document of one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Profile photo URL
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    /// Last update time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Overwrite the fields `update` supplies, keep the rest
    pub fn merge(&mut self, update: UserProfile) {
        if update.display_name.is_some() {
            self.display_name = update.display_name;
        }
        if update.phone.is_some() {
            self.phone = update.phone;
        }
        if update.photo_url.is_some() {
            self.photo_url = update.photo_url;
        }
        if update.updated_at.is_some() {
            self.updated_at = update.updated_at;
        }
    }
}

/// Remote document store keyed by user id
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch a profile document
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Write a profile document
    ///
    /// With `merge` only the supplied fields change; without it the document
    /// is replaced.
    async fn set(&self, user_id: &str, update: UserProfile, merge: bool) -> Result<()>;
}

/// Document store held in memory
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    documents: Mutex<HashMap<String, UserProfile>>,
}

impl InMemoryProfileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(documents.get(user_id).cloned())
    }

    async fn set(&self, user_id: &str, update: UserProfile, merge: bool) -> Result<()> {
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        match documents.get_mut(user_id) {
            Some(existing) if merge => existing.merge(update),
            _ => {
                documents.insert(user_id.to_string(), update);
            }
        }
        Ok(())
    }
}

/// Values shown on the profile editing screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    /// Display name
    pub display_name: String,
    /// Email (read from the identity)
    pub email: String,
    /// Phone number
    pub phone: String,
}

/// Profile operations used by the user and edit-profile screens
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
}

impl ProfileService {
    /// Create a service over a document store
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Fetch the stored profile document
    pub async fn get(&self, user_id: &str) -> Result<Option<UserProfile>> {
        require_user(user_id)?;
        self.store.get(user_id).await
    }

    /// Build the edit form
    ///
    /// Stored name and phone win; the identity fills in a missing name. The
    /// email always comes from the identity.
    pub async fn load_form(&self, identity: &Identity) -> Result<ProfileForm> {
        let stored = self.get(&identity.uid).await?;
        if stored.is_none() {
            tracing::warn!("No profile document for {}", identity.uid);
        }
        let stored = stored.unwrap_or_default();

        Ok(ProfileForm {
            display_name: stored
                .display_name
                .filter(|n| !n.is_empty())
                .or_else(|| identity.display_name.clone())
                .unwrap_or_default(),
            email: identity.email.clone().unwrap_or_default(),
            phone: stored.phone.unwrap_or_default(),
        })
    }

    /// Save the edit form (merge write)
    pub async fn save_form(&self, user_id: &str, form: &ProfileForm) -> Result<()> {
        require_user(user_id)?;
        if form.display_name.trim().is_empty() {
            return Err(Error::Validation("Display name is required".to_string()));
        }
        if form.email.trim().is_empty() {
            return Err(Error::Validation("Email is required".to_string()));
        }

        let update = UserProfile {
            display_name: Some(form.display_name.trim().to_string()),
            phone: Some(form.phone.trim().to_string()),
            photo_url: None,
            updated_at: Some(Utc::now()),
        };
        self.store.set(user_id, update, true).await?;
        tracing::info!("Updated profile of {}", user_id);
        Ok(())
    }

    /// Record a new profile photo URL (merge write)
    pub async fn update_photo(&self, user_id: &str, photo_url: &str) -> Result<()> {
        require_user(user_id)?;
        if photo_url.trim().is_empty() {
            return Err(Error::Validation("Photo URL is required".to_string()));
        }

        let update = UserProfile {
            photo_url: Some(photo_url.to_string()),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        self.store.set(user_id, update, true).await?;
        tracing::info!("Updated profile photo of {}", user_id);
        Ok(())
    }
}

fn require_user(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(Error::Validation("A user id is required".to_string()));
    }
    Ok(())
}
