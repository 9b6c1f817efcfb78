//! ReparApp demo
//!
//! Runs the session controller and local store headless: seeds the provider
//! directory, signs a demo user in and out, and logs which screen graph the
//! navigation layer would show at each step.
//!
//! Usage: `reparapp [config.json]`

use anyhow::Context;
use reparapp::{
    catalog::ServiceCategory,
    config::Config,
    navigation::NavigationRouter,
    session::{AuthSessionController, IdentityProvider, InMemoryIdentityProvider},
    storage::{LocalStore, NewProvider, Platform},
    OrEmpty,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reparapp::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "reparapp.json".to_string());
    let config = Config::load(&config_path).with_context(|| format!("loading {}", config_path))?;

    let store = LocalStore::open(&config.storage, Platform::current());
    tracing::info!("Local store backend: {}", store.backend_name());
    seed_directory(&store)?;

    let provider = Arc::new(InMemoryIdentityProvider::new());
    let controller = AuthSessionController::start(
        Arc::clone(&provider) as Arc<dyn IdentityProvider>,
        config.session_policy(),
    );
    let mut signal = controller.subscribe();
    let session = signal.wait_until_resolved().await;
    tracing::info!("Session resolved as {:?}", session.status());

    // Built after resolution so the first sign-in is a graph change
    let mut router = NavigationRouter::new(signal);
    tracing::info!("Showing {:?}", router.current_graph());

    let identity = provider
        .register("Demo", "demo@reparapp.local", "secret123")
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;
    let graph = router.next_graph().await.context("session controller stopped")?;
    tracing::info!("Showing {:?} for {}", graph, identity.uid);

    let listings = store
        .provider_listings(&identity.uid, Some(ServiceCategory::Plumbing.slug()))
        .or_empty()?;
    if let Some(first) = listings.first() {
        let now_favorite = store.toggle_favorite(&identity.uid, &first.provider)?;
        tracing::info!("{} favorite: {}", first.provider.name, now_favorite);
    }
    for favorite in store.list_favorites(&identity.uid).or_empty()? {
        tracing::info!("Favorite: {} ({:.1})", favorite.provider_name, favorite.provider_rating);
    }

    provider.sign_out();
    let graph = router.next_graph().await.context("session controller stopped")?;
    tracing::info!("Showing {:?}", graph);

    controller.shutdown().await;
    Ok(())
}

fn seed_directory(store: &LocalStore) -> anyhow::Result<()> {
    if !store.list_providers(None).or_empty()?.is_empty() {
        return Ok(());
    }

    for category in ServiceCategory::ALL {
        let input = NewProvider::new(format!("{} Express", category.label()), category.slug())
            .with_id(format!("seed-{}", category.slug()))
            .with_rating(4.5, 10);
        match store.add_provider(input) {
            Ok(_) => {}
            Err(e) if e.is_storage_unavailable() => {
                tracing::warn!("Skipping directory seed: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
