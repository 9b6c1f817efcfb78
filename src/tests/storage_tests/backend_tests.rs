// Backend Tests - Testing backend selection, persistence, and degradation

use crate::config::{BackendChoice, StorageSettings};
use crate::storage::*;
use crate::{Error, OrEmpty};
use chrono::{DateTime, Utc};
use tempfile::{NamedTempFile, TempDir};

fn contact(id: &str, phone: &str) -> Record {
    Record::Contact(ContactRecord {
        id: id.to_string(),
        fields: ContactFields::default().with_phone(phone),
    })
}

fn provider(id: &str, name: &str) -> Record {
    Record::Provider(ProviderRecord {
        id: id.to_string(),
        name: name.to_string(),
        category: "plomeria".to_string(),
        phone: None,
        email: None,
        address: None,
        rating: 0.0,
        rating_count: 0,
        created_at: Utc::now(),
    })
}

fn settings_in(dir: &TempDir, backend: BackendChoice) -> StorageSettings {
    StorageSettings {
        backend,
        database_path: dir.path().join("data").join("reparapp.db"),
        kv_path: dir.path().join("data").join("reparapp_kv.json"),
    }
}

#[test]
fn test_namespaced_keys() {
    assert_eq!(RecordKind::Contact.namespaced_key("u1"), "contact_u1");
    assert_eq!(RecordKind::Favorite.namespaced_key("u1_p1"), "favorite_u1_p1");
    assert_eq!(RecordKind::Provider.namespaced_key("p1"), "provider_p1");
}

#[test]
fn test_sqlite_schema_creation_is_idempotent() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("reparapp.db");

    {
        let mut backend = SqliteBackend::open(&path).expect("Failed to open database");
        backend.put(&contact("u1", "555"), WriteMode::Replace).expect("Failed to put");
    }

    // Reopening runs schema creation again without touching data
    let backend = SqliteBackend::open(&path).expect("Failed to reopen database");
    let loaded = backend.get(RecordKind::Contact, "u1").expect("Failed to get");
    assert_eq!(loaded, Some(contact("u1", "555")));
}

#[test]
fn test_sqlite_one_contact_per_user() {
    let mut backend = SqliteBackend::open_in_memory().expect("Failed to open database");
    backend.put(&contact("u1", "111"), WriteMode::Replace).expect("Failed to put");
    backend.put(&contact("u1", "222"), WriteMode::Replace).expect("Failed to put");

    let all = backend.get_all(&RecordFilter::Contacts).expect("Failed to list");
    assert_eq!(all, vec![contact("u1", "222")]);
}

#[test]
fn test_reject_mode_conflicts_on_both_backends() {
    let backends: Vec<Box<dyn StorageBackend>> = vec![
        Box::new(SqliteBackend::open_in_memory().expect("Failed to open database")),
        Box::new(KeyValueBackend::in_memory()),
    ];

    for mut backend in backends {
        backend.put(&provider("p1", "First"), WriteMode::Reject).expect("Failed to put");
        let err = backend
            .put(&provider("p1", "Second"), WriteMode::Reject)
            .expect_err("Duplicate insert should fail");
        assert!(err.is_conflict(), "{}: {:?}", backend.name(), err);

        match backend.get(RecordKind::Provider, "p1").expect("Failed to get") {
            Some(Record::Provider(p)) => assert_eq!(p.name, "First"),
            other => panic!("{}: unexpected {:?}", backend.name(), other),
        }
    }
}

#[test]
fn test_kv_persists_across_reopen() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("kv.json");

    {
        let mut backend = KeyValueBackend::open(&path).expect("Failed to open store");
        backend.put(&contact("u1", "555"), WriteMode::Replace).expect("Failed to put");
        backend.put(&provider("p1", "Acme"), WriteMode::Reject).expect("Failed to put");
    }

    let raw = std::fs::read_to_string(&path).expect("Failed to read store file");
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).expect("Store file should be a JSON object");
    assert!(map.contains_key("contact_u1"));
    assert!(map.contains_key("provider_p1"));

    let mut backend = KeyValueBackend::open(&path).expect("Failed to reopen store");
    assert_eq!(backend.len(), 2);
    assert_eq!(
        backend.get(RecordKind::Contact, "u1").expect("Failed to get"),
        Some(contact("u1", "555"))
    );

    assert!(backend.delete(RecordKind::Contact, "u1").expect("Failed to delete"));
    let backend = KeyValueBackend::open(&path).expect("Failed to reopen store");
    assert_eq!(backend.len(), 1);
}

#[test]
fn test_kv_empty_file_starts_empty() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    let backend = KeyValueBackend::open(file.path()).expect("Failed to open store");
    assert!(backend.is_empty());
}

#[test]
fn test_kv_prefix_scan_does_not_mix_kinds() {
    let mut backend = KeyValueBackend::in_memory();
    backend.put(&contact("u1", "1"), WriteMode::Replace).expect("Failed to put");
    backend.put(&provider("p1", "Acme"), WriteMode::Replace).expect("Failed to put");

    let contacts = backend.get_all(&RecordFilter::Contacts).expect("Failed to list");
    assert_eq!(contacts.len(), 1);
    let providers = backend
        .get_all(&RecordFilter::Providers { category: None })
        .expect("Failed to list");
    assert_eq!(providers.len(), 1);
}

#[test]
fn test_unavailable_backend_reports_every_call() {
    let mut backend = UnavailableBackend::new("no sqlite on this platform");

    assert!(matches!(
        backend.get(RecordKind::Contact, "u1"),
        Err(Error::StorageUnavailable(_))
    ));
    assert!(matches!(
        backend.get_all(&RecordFilter::Contacts),
        Err(Error::StorageUnavailable(_))
    ));
    assert!(matches!(
        backend.put(&contact("u1", "1"), WriteMode::Replace),
        Err(Error::StorageUnavailable(_))
    ));
    assert!(matches!(
        backend.delete(RecordKind::Contact, "u1"),
        Err(Error::StorageUnavailable(_))
    ));
    assert_eq!(backend.reason(), "no sqlite on this platform");
}

#[test]
fn test_unavailable_store_degrades_to_empty() {
    let store = LocalStore::new(Box::new(UnavailableBackend::new("missing")));
    assert!(!store.is_available());

    let err = store.get_contact("u1").expect_err("Should report unavailable");
    assert!(err.is_storage_unavailable());

    assert_eq!(store.get_contact("u1").or_empty().expect("Should degrade"), None);
    assert!(store.list_favorites("u1").or_empty().expect("Should degrade").is_empty());
    assert!(!store.is_favorite("u1", "p1").or_empty().expect("Should degrade"));

    // Validation errors are not swallowed
    assert!(matches!(store.get_contact("").or_empty(), Err(Error::Validation(_))));
}

#[test]
fn test_open_backend_auto_selects_by_platform() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let settings = settings_in(&dir, BackendChoice::Auto);

    let native = open_backend(&settings, Platform::Native);
    assert_eq!(native.name(), "sqlite");

    let web = open_backend(&settings, Platform::Web);
    assert_eq!(web.name(), "key_value");
}

#[test]
fn test_open_backend_explicit_choice_wins() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    let kv = open_backend(&settings_in(&dir, BackendChoice::KeyValue), Platform::Native);
    assert_eq!(kv.name(), "key_value");

    let sqlite = open_backend(&settings_in(&dir, BackendChoice::Relational), Platform::Web);
    assert_eq!(sqlite.name(), "sqlite");
}

#[test]
fn test_open_backend_degrades_when_sqlite_cannot_open() {
    // A regular file where the database directory should be
    let blocker = NamedTempFile::new().expect("Failed to create temp file");
    let settings = StorageSettings {
        backend: BackendChoice::Relational,
        database_path: blocker.path().join("reparapp.db"),
        ..StorageSettings::default()
    };

    let store = LocalStore::open(&settings, Platform::Native);
    assert_eq!(store.backend_name(), "unavailable");
    assert!(store.list_providers(None).expect_err("Should be unavailable").is_storage_unavailable());
}

#[test]
fn test_open_backend_degrades_on_corrupt_kv_file() {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    std::fs::write(file.path(), "not json").expect("Failed to write");

    let settings = StorageSettings {
        backend: BackendChoice::KeyValue,
        kv_path: file.path().to_path_buf(),
        ..StorageSettings::default()
    };
    let backend = open_backend(&settings, Platform::Web);
    assert_eq!(backend.name(), "unavailable");
}

#[test]
fn test_platform_current_is_native_off_wasm() {
    assert_eq!(Platform::current(), Platform::Native);
}

#[test]
fn test_kv_failed_write_is_rolled_back() {
    // A regular file where the store directory should be
    let dir = TempDir::new().expect("Failed to create temp dir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").expect("Failed to write");

    let backend = KeyValueBackend::open(blocker.join("kv.json")).expect("Failed to open store");
    let store = LocalStore::new(Box::new(backend));

    let input = NewProvider::new("Acme", "plomeria").with_id("p1");
    let err = store.add_provider(input.clone()).expect_err("Write should fail");
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(store.get_provider("p1").expect("Failed to get"), None);

    // Retrying hits the same write error, not a conflict with a phantom record
    let err = store.add_provider(input).expect_err("Write should fail again");
    assert!(!err.is_conflict());
    assert!(store.list_providers(None).expect("Failed to list").is_empty());
}

#[test]
fn test_kv_failed_delete_is_rolled_back() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("kv.json");

    let mut backend = KeyValueBackend::open(&path).expect("Failed to open store");
    backend.put(&contact("u1", "555"), WriteMode::Replace).expect("Failed to put");

    // A directory in place of the store file makes the next write fail
    std::fs::remove_file(&path).expect("Failed to remove store file");
    std::fs::create_dir(&path).expect("Failed to create directory");

    assert!(backend.delete(RecordKind::Contact, "u1").is_err());
    assert_eq!(
        backend.get(RecordKind::Contact, "u1").expect("Failed to get"),
        Some(contact("u1", "555"))
    );
}

#[test]
fn test_sqlite_reads_legacy_rows() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("reparapp.db");
    let backend = SqliteBackend::open(&path).expect("Failed to open database");

    // Rows written by an older app version
    let conn = rusqlite::Connection::open(&path).expect("Failed to open connection");
    conn.execute(
        "INSERT INTO favorites (id, provider_id, provider_name, user_id) VALUES ('u1_old', 'old', 'Old', 'u1')",
        [],
    )
    .expect("Failed to insert favorite");
    conn.execute(
        "INSERT INTO providers (id, name, category, rating_count) VALUES ('p1', 'Acme', 'plomeria', 5000000000)",
        [],
    )
    .expect("Failed to insert provider");
    drop(conn);

    let store = LocalStore::new(Box::new(backend));
    store
        .add_favorite("u1", "new", &ProviderSnapshot::new("New", 4.0, "plomeria"))
        .expect("Failed to add favorite");

    // A missing timestamp reads as the oldest favorite, matching its sort position
    let favorites = store.list_favorites("u1").expect("Failed to list");
    let ids: Vec<_> = favorites.iter().map(|f| f.provider_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "old"]);
    assert_eq!(favorites[1].created_at, DateTime::<Utc>::default());
    assert_eq!(favorites[1].provider_rating, 0.0);

    let provider = store.get_provider("p1").expect("Failed to get").expect("Provider missing");
    assert_eq!(provider.rating_count, u32::MAX);
    assert_eq!(provider.created_at, DateTime::<Utc>::default());
}
