// Storage Tests Module - Testing the storage module
// Tests organized by storage functionality:
// - contact_tests: Contact upsert/get/delete (whole-record replace, null fields)
// - favorite_tests: Favorite add/remove/list (composite keys, ordering, toggles)
// - provider_tests: Provider directory (id generation, conflicts, category filter)
// - backend_tests: Backend selection, persistence, and unavailable degradation

mod backend_tests;
mod provider_tests;

use crate::storage::{KeyValueBackend, LocalStore};

/// One isolated store per backend, so every behavior is checked on both
fn stores() -> Vec<(&'static str, LocalStore)> {
    vec![
        ("sqlite", LocalStore::in_memory().expect("Failed to create in-memory store")),
        ("key_value", LocalStore::new(Box::new(KeyValueBackend::in_memory()))),
    ]
}
