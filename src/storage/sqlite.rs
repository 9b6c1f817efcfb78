//! SQLite-based storage backend
//!
//! Relational backend used on native platforms. Each record kind has its own
//! table; column names are kept stable so databases written by earlier app
//! versions stay readable.

use crate::{
    storage::{
        backend::{StorageBackend, WriteMode},
        record::{
            format_timestamp, parse_timestamp, ContactFields, ContactRecord, FavoriteRecord,
            ProviderRecord, Record, RecordFilter, RecordKind,
        },
    },
    Error, Result,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

const CONTACT_COLUMNS: &str = "id, direccion, telefono, tipo_vivienda, referencia, notas";
const FAVORITE_COLUMNS: &str =
    "id, provider_id, provider_name, provider_rating, services_offered, user_id, created_at";
const PROVIDER_COLUMNS: &str =
    "id, name, category, phone, email, address, rating, rating_count, created_at";

/// SQLite-based storage backend
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::StorageUnavailable(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::StorageUnavailable(format!("Failed to open database: {}", e)))?;

        let mut backend = Self { conn };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::StorageUnavailable(format!("Failed to create in-memory database: {}", e))
        })?;

        let mut backend = Self { conn };
        backend.init_schema()?;
        Ok(backend)
    }

    /// Create tables and indexes; a no-op when they already exist
    fn init_schema(&mut self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS user_contact (
                id TEXT PRIMARY KEY NOT NULL,
                direccion TEXT,
                telefono TEXT,
                tipo_vivienda TEXT,
                referencia TEXT,
                notas TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS favorites (
                id TEXT PRIMARY KEY NOT NULL,
                provider_id TEXT NOT NULL,
                provider_name TEXT NOT NULL,
                provider_rating REAL,
                services_offered TEXT,
                user_id TEXT NOT NULL,
                created_at TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS providers (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                phone TEXT,
                email TEXT,
                address TEXT,
                rating REAL DEFAULT 0.0,
                rating_count INTEGER DEFAULT 0,
                created_at TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_favorites_user ON favorites(user_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_providers_category ON providers(category)",
            [],
        )?;

        Ok(())
    }

    fn table(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Contact => "user_contact",
            RecordKind::Favorite => "favorites",
            RecordKind::Provider => "providers",
        }
    }

    fn columns(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Contact => CONTACT_COLUMNS,
            RecordKind::Favorite => FAVORITE_COLUMNS,
            RecordKind::Provider => PROVIDER_COLUMNS,
        }
    }

    fn read_row(kind: RecordKind, row: &Row<'_>) -> rusqlite::Result<Record> {
        Ok(match kind {
            RecordKind::Contact => Record::Contact(ContactRecord {
                id: row.get(0)?,
                fields: ContactFields {
                    address: row.get(1)?,
                    phone: row.get(2)?,
                    housing_type: row.get(3)?,
                    reference: row.get(4)?,
                    notes: row.get(5)?,
                },
            }),
            RecordKind::Favorite => {
                let created_at: Option<String> = row.get(6)?;
                Record::Favorite(FavoriteRecord {
                    id: row.get(0)?,
                    provider_id: row.get(1)?,
                    provider_name: row.get(2)?,
                    provider_rating: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    services_offered: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    user_id: row.get(5)?,
                    created_at: parse_timestamp(created_at.as_deref()),
                })
            }
            RecordKind::Provider => {
                let created_at: Option<String> = row.get(8)?;
                Record::Provider(ProviderRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    phone: row.get(3)?,
                    email: row.get(4)?,
                    address: row.get(5)?,
                    rating: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                    rating_count: u32::try_from(row.get::<_, Option<i64>>(7)?.unwrap_or(0).max(0))
                        .unwrap_or(u32::MAX),
                    created_at: parse_timestamp(created_at.as_deref()),
                })
            }
        })
    }

    fn write(&self, record: &Record, verb: &str) -> rusqlite::Result<usize> {
        match record {
            Record::Contact(c) => self.conn.execute(
                &format!("{} INTO user_contact ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", verb, CONTACT_COLUMNS),
                params![
                    &c.id,
                    &c.fields.address,
                    &c.fields.phone,
                    &c.fields.housing_type,
                    &c.fields.reference,
                    &c.fields.notes,
                ],
            ),
            Record::Favorite(f) => self.conn.execute(
                &format!("{} INTO favorites ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)", verb, FAVORITE_COLUMNS),
                params![
                    &f.id,
                    &f.provider_id,
                    &f.provider_name,
                    f.provider_rating,
                    &f.services_offered,
                    &f.user_id,
                    format_timestamp(&f.created_at),
                ],
            ),
            Record::Provider(p) => self.conn.execute(
                &format!(
                    "{} INTO providers ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    verb, PROVIDER_COLUMNS
                ),
                params![
                    &p.id,
                    &p.name,
                    &p.category,
                    &p.phone,
                    &p.email,
                    &p.address,
                    p.rating,
                    p.rating_count as i64,
                    format_timestamp(&p.created_at),
                ],
            ),
        }
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn get(&self, kind: RecordKind, key: &str) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            Self::columns(kind),
            Self::table(kind)
        );
        let record = self
            .conn
            .query_row(&sql, params![key], |row| Self::read_row(kind, row))
            .optional()?;
        Ok(record)
    }

    fn get_all(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let kind = filter.kind();
        let select = format!("SELECT {} FROM {}", Self::columns(kind), Self::table(kind));

        let (sql, arg) = match filter {
            RecordFilter::Contacts => (format!("{} ORDER BY id ASC", select), None),
            RecordFilter::FavoritesOf(user_id) => (
                format!("{} WHERE user_id = ?1 ORDER BY created_at DESC, id ASC", select),
                Some(user_id.as_str()),
            ),
            RecordFilter::Providers { category: Some(category) } => (
                format!("{} WHERE category = ?1 ORDER BY name ASC, id ASC", select),
                Some(category.as_str()),
            ),
            RecordFilter::Providers { category: None } => {
                (format!("{} ORDER BY name ASC, id ASC", select), None)
            }
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let read = |row: &Row<'_>| Self::read_row(kind, row);
        let records = match arg {
            Some(arg) => stmt
                .query_map(params![arg], read)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], read)?
                .collect::<std::result::Result<Vec<_>, _>>()?,
        };

        Ok(records)
    }

    fn put(&mut self, record: &Record, mode: WriteMode) -> Result<()> {
        let verb = match mode {
            WriteMode::Replace => "INSERT OR REPLACE",
            WriteMode::Reject => "INSERT",
        };

        match self.write(record, verb) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::Conflict {
                    kind: record.kind(),
                    id: record.key().to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&mut self, kind: RecordKind, key: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", Self::table(kind));
        let affected = self.conn.execute(&sql, params![key])?;
        Ok(affected > 0)
    }
}
