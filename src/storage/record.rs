//! Record kinds persisted by the local store
//!
//! Three record kinds are kept for the signed-in identity:
//! - `ContactRecord` - the user's own contact data, one per user id
//! - `FavoriteRecord` - a provider the user marked as favorite
//! - `ProviderRecord` - an entry of the provider directory

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Namespace a record lives in (table or key prefix)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// User contact data
    Contact,
    /// Favorite provider of a user
    Favorite,
    /// Provider directory entry
    Provider,
}

impl RecordKind {
    /// All record kinds
    pub const ALL: [RecordKind; 3] = [RecordKind::Contact, RecordKind::Favorite, RecordKind::Provider];

    /// Key prefix used by key/value backends
    pub fn prefix(&self) -> &'static str {
        match self {
            RecordKind::Contact => "contact",
            RecordKind::Favorite => "favorite",
            RecordKind::Provider => "provider",
        }
    }

    /// Namespaced key for a record id (`"<kind>_<id>"`)
    pub fn namespaced_key(&self, id: &str) -> String {
        format!("{}_{}", self.prefix(), id)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Fields of a contact record, all optional
///
/// Serialized field names match the persisted column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    /// Street address
    #[serde(rename = "direccion")]
    pub address: Option<String>,
    /// Phone number
    #[serde(rename = "telefono")]
    pub phone: Option<String>,
    /// Housing type (house, apartment, ...)
    #[serde(rename = "tipo_vivienda")]
    pub housing_type: Option<String>,
    /// Reference note to find the address
    #[serde(rename = "referencia")]
    pub reference: Option<String>,
    /// Free-text notes
    #[serde(rename = "notas")]
    pub notes: Option<String>,
}

impl ContactFields {
    /// Builder: set the address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Builder: set the phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Builder: set the housing type
    pub fn with_housing_type(mut self, housing_type: impl Into<String>) -> Self {
        self.housing_type = Some(housing_type.into());
        self
    }

    /// Builder: set the reference note
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Builder: set the notes
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Contact data of one user, keyed by user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// User identifier (primary key)
    pub id: String,
    /// Contact fields
    #[serde(flatten)]
    pub fields: ContactFields,
}

/// Snapshot of the provider data copied into a favorite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSnapshot {
    /// Provider display name
    pub name: String,
    /// Provider rating at the time it was favorited
    pub rating: f64,
    /// Summary of offered services
    pub services: String,
}

impl ProviderSnapshot {
    /// Create a new snapshot
    pub fn new(name: impl Into<String>, rating: f64, services: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rating,
            services: services.into(),
        }
    }
}

/// A provider favorited by a user
///
/// The record's existence is the favorite flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    /// Composite key `"<user_id>_<provider_id>"`
    pub id: String,
    /// Favorited provider id
    pub provider_id: String,
    /// Provider name at favoriting time
    pub provider_name: String,
    /// Provider rating at favoriting time
    pub provider_rating: f64,
    /// Offered services summary
    pub services_offered: String,
    /// Owning user id
    pub user_id: String,
    /// When the favorite was added
    pub created_at: DateTime<Utc>,
}

impl FavoriteRecord {
    /// Build the composite key for a user/provider pair
    pub fn composite_key(user_id: &str, provider_id: &str) -> String {
        format!("{}_{}", user_id, provider_id)
    }
}

/// Provider directory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Provider identifier
    pub id: String,
    /// Business name
    pub name: String,
    /// Service category slug
    pub category: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Average rating
    pub rating: f64,
    /// Number of ratings received
    pub rating_count: u32,
    /// When the provider was added
    pub created_at: DateTime<Utc>,
}

/// Input for creating a provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProvider {
    /// Explicit identifier; generated when absent
    pub id: Option<String>,
    /// Business name (required)
    pub name: String,
    /// Service category slug (required)
    pub category: String,
    /// Contact phone
    pub phone: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Initial rating
    pub rating: f64,
    /// Initial rating count
    pub rating_count: u32,
}

impl NewProvider {
    /// Create a provider input with the required fields
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    /// Builder: use an explicit identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder: set the phone
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Builder: set the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder: set the address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Builder: set rating and rating count
    pub fn with_rating(mut self, rating: f64, rating_count: u32) -> Self {
        self.rating = rating;
        self.rating_count = rating_count;
        self
    }
}

/// Any persisted record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// Contact record
    Contact(ContactRecord),
    /// Favorite record
    Favorite(FavoriteRecord),
    /// Provider record
    Provider(ProviderRecord),
}

impl Record {
    /// Kind of this record
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Contact(_) => RecordKind::Contact,
            Record::Favorite(_) => RecordKind::Favorite,
            Record::Provider(_) => RecordKind::Provider,
        }
    }

    /// Primary key of this record within its kind
    pub fn key(&self) -> &str {
        match self {
            Record::Contact(c) => &c.id,
            Record::Favorite(f) => &f.id,
            Record::Provider(p) => &p.id,
        }
    }
}

/// Selection for `get_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every contact record, ordered by user id
    Contacts,
    /// Favorites of one user, most recent first
    FavoritesOf(String),
    /// Providers, optionally in one category, ordered by name
    Providers {
        /// Category slug to match exactly
        category: Option<String>,
    },
}

impl RecordFilter {
    /// Record kind selected by this filter
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordFilter::Contacts => RecordKind::Contact,
            RecordFilter::FavoritesOf(_) => RecordKind::Favorite,
            RecordFilter::Providers { .. } => RecordKind::Provider,
        }
    }

    /// Whether a record is selected
    pub fn matches(&self, record: &Record) -> bool {
        match (self, record) {
            (RecordFilter::Contacts, Record::Contact(_)) => true,
            (RecordFilter::FavoritesOf(user_id), Record::Favorite(f)) => &f.user_id == user_id,
            (RecordFilter::Providers { category }, Record::Provider(p)) => {
                category.as_ref().is_none_or(|c| &p.category == c)
            }
            _ => false,
        }
    }

    /// Ordering contract of this filter
    ///
    /// Ties are broken by key so results are deterministic on every backend.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let primary = match (a, b) {
            (Record::Favorite(x), Record::Favorite(y)) => y.created_at.cmp(&x.created_at),
            (Record::Provider(x), Record::Provider(y)) => x.name.cmp(&y.name),
            _ => Ordering::Equal,
        };
        primary.then_with(|| a.key().cmp(b.key()))
    }

    /// Sort records in place according to this filter
    pub fn sort(&self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

/// Fixed-width RFC 3339 timestamp, so text order equals time order
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
///
/// Missing or unparsable values map to the Unix epoch, so legacy rows sort as
/// the oldest.
pub(crate) fn parse_timestamp(text: Option<&str>) -> DateTime<Utc> {
    text.and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
