//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::datasources::{
    CachedLaunchCatalog, DataSourceError, InMemoryUserStore, LaunchCatalog, StaticLaunchCatalog,
    UserStore,
};
use crate::identity::IdentityResolver;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Holds only long-lived stores; everything
/// tied to a caller lives in the per-request
/// [`RequestContext`](crate::context::RequestContext).
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    launches: Arc<dyn LaunchCatalog>,
    users: Arc<dyn UserStore>,
    identity: IdentityResolver,
}

impl AppState {
    /// State over explicit stores.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        launches: Arc<dyn LaunchCatalog>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let identity = IdentityResolver::new(Arc::clone(&users));
        Self {
            inner: Arc::new(AppStateInner {
                config,
                launches,
                users,
                identity,
            }),
        }
    }

    /// State with the configured catalog behind a TTL cache and an empty
    /// in-memory user store.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    pub async fn from_config(config: ServerConfig) -> Result<Self, DataSourceError> {
        let catalog = match &config.catalog_path {
            Some(path) => StaticLaunchCatalog::load(path).await?,
            None => StaticLaunchCatalog::bundled()?,
        };
        let launches = Arc::new(CachedLaunchCatalog::new(
            Arc::new(catalog),
            config.catalog_cache_ttl,
        ));
        Ok(Self::new(config, launches, Arc::new(InMemoryUserStore::new())))
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn launches(&self) -> &Arc<dyn LaunchCatalog> {
        &self.inner.launches
    }

    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.inner.users
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityResolver {
        &self.inner.identity
    }
}
