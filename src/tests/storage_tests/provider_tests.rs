// Provider Tests - Testing the provider directory

use super::stores;
use crate::storage::{NewProvider, ProviderSnapshot};
use crate::Error;

#[test]
fn test_add_provider_generates_id_and_defaults() {
    for (backend, store) in stores() {
        let provider = store
            .add_provider(NewProvider::new("TecnoFix Pro", "electricidad"))
            .expect("Failed to add provider");

        assert!(uuid::Uuid::parse_str(&provider.id).is_ok(), "{}: id should be generated", backend);
        assert_eq!(provider.rating, 0.0);
        assert_eq!(provider.rating_count, 0);

        let loaded = store
            .get_provider(&provider.id)
            .expect("Failed to get")
            .expect("Provider missing");
        assert_eq!(loaded.name, "TecnoFix Pro", "{}", backend);
        assert_eq!(loaded.category, "electricidad");
    }
}

#[test]
fn test_generated_ids_are_unique() {
    for (_, store) in stores() {
        let a = store.add_provider(NewProvider::new("A", "limpieza")).expect("Failed to add");
        let b = store.add_provider(NewProvider::new("A", "limpieza")).expect("Failed to add");
        assert_ne!(a.id, b.id);
    }
}

#[test]
fn test_duplicate_provider_id_is_rejected() {
    for (backend, store) in stores() {
        store
            .add_provider(NewProvider::new("Original", "plomeria").with_id("p1").with_phone("111"))
            .expect("Failed to add provider");

        let result = store.add_provider(
            NewProvider::new("Impostor", "cerrajeria").with_id("p1").with_phone("999"),
        );
        match result {
            Err(Error::Conflict { id, .. }) => assert_eq!(id, "p1"),
            other => panic!("{}: expected conflict, got {:?}", backend, other),
        }

        // Prior record untouched
        let loaded = store.get_provider("p1").expect("Failed to get").expect("Provider missing");
        assert_eq!(loaded.name, "Original", "{}", backend);
        assert_eq!(loaded.category, "plomeria");
        assert_eq!(loaded.phone.as_deref(), Some("111"));
        assert_eq!(store.list_providers(None).expect("Failed to list").len(), 1);
    }
}

#[test]
fn test_list_providers_ordered_by_name() {
    for (backend, store) in stores() {
        for name in ["Hogar Seguro", "CleanMaster", "TecnoFix Pro"] {
            store.add_provider(NewProvider::new(name, "reparaciones")).expect("Failed to add");
        }

        let names: Vec<String> = store
            .list_providers(None)
            .expect("Failed to list")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["CleanMaster", "Hogar Seguro", "TecnoFix Pro"], "{}", backend);
    }
}

#[test]
fn test_list_providers_by_category() {
    for (backend, store) in stores() {
        store.add_provider(NewProvider::new("Zeta Plumbing", "plomeria")).expect("Failed to add");
        store.add_provider(NewProvider::new("Alfa Plumbing", "plomeria")).expect("Failed to add");
        store.add_provider(NewProvider::new("Volt", "electricidad")).expect("Failed to add");

        let plumbing = store.list_providers(Some("plomeria")).expect("Failed to list");
        let names: Vec<&str> = plumbing.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alfa Plumbing", "Zeta Plumbing"], "{}", backend);

        assert!(store.list_providers(Some("carpinteria")).expect("Failed to list").is_empty());
    }
}

#[test]
fn test_delete_provider() {
    for (backend, store) in stores() {
        store
            .add_provider(NewProvider::new("Gone Soon", "limpieza").with_id("p9"))
            .expect("Failed to add");

        assert!(store.delete_provider("p9").expect("Failed to delete"), "{}", backend);
        assert!(store.get_provider("p9").expect("Failed to get").is_none());
        assert!(!store.delete_provider("p9").expect("Failed to delete"));

        // The id is free again
        store
            .add_provider(NewProvider::new("Back Again", "limpieza").with_id("p9"))
            .expect("Failed to re-add");
    }
}

#[test]
fn test_provider_validation() {
    for (_, store) in stores() {
        assert!(matches!(
            store.add_provider(NewProvider::new("   ", "plomeria")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            store.add_provider(NewProvider::new("Named", "")),
            Err(Error::Validation(_))
        ));
        assert!(store.list_providers(None).expect("Failed to list").is_empty());
    }
}

#[test]
fn test_blank_optional_fields_stored_as_null() {
    for (backend, store) in stores() {
        let provider = store
            .add_provider(
                NewProvider::new("  Trimmed  ", "carpinteria")
                    .with_phone("")
                    .with_email("  ")
                    .with_address("Calle 2"),
            )
            .expect("Failed to add");

        let loaded = store
            .get_provider(&provider.id)
            .expect("Failed to get")
            .expect("Provider missing");
        assert_eq!(loaded.name, "Trimmed", "{}", backend);
        assert_eq!(loaded.phone, None);
        assert_eq!(loaded.email, None);
        assert_eq!(loaded.address.as_deref(), Some("Calle 2"));
    }
}

#[test]
fn test_provider_listings_carry_favorite_flags() {
    for (backend, store) in stores() {
        let a = store
            .add_provider(NewProvider::new("Alfa", "plomeria").with_id("a"))
            .expect("Failed to add");
        store
            .add_provider(NewProvider::new("Beta", "plomeria").with_id("b"))
            .expect("Failed to add");
        store
            .add_provider(NewProvider::new("Gamma", "electricidad").with_id("g"))
            .expect("Failed to add");

        store
            .add_favorite("u1", &a.id, &ProviderSnapshot::new(a.name.clone(), a.rating, a.category.clone()))
            .expect("Failed to add favorite");

        let listings = store.provider_listings("u1", Some("plomeria")).expect("Failed to list");
        let flags: Vec<(&str, bool)> = listings
            .iter()
            .map(|l| (l.provider.id.as_str(), l.is_favorite))
            .collect();
        assert_eq!(flags, vec![("a", true), ("b", false)], "{}", backend);

        // Another user sees no favorites
        let other = store.provider_listings("u2", None).expect("Failed to list");
        assert_eq!(other.len(), 3);
        assert!(other.iter().all(|l| !l.is_favorite));
    }
}
