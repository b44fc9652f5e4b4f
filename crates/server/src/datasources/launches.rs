//! Launch catalog adapters.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use launchpad_core::{Launch, LaunchId};
use moka::future::Cache;
use tracing::{debug, info, instrument};

use super::{DataSourceError, LaunchCatalog};

const BUNDLED_CATALOG: &str = include_str!("../../data/launches.json");

/// Catalog held in memory, loaded once.
#[derive(Debug, Clone)]
pub struct StaticLaunchCatalog {
    launches: Arc<Vec<Launch>>,
    by_id: Arc<HashMap<LaunchId, usize>>,
}

impl StaticLaunchCatalog {
    /// Catalog of `launches`, ordered oldest first.
    #[must_use]
    pub fn new(mut launches: Vec<Launch>) -> Self {
        launches.sort_by_key(|l| l.launched_at);
        let by_id = launches
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id.clone(), i))
            .collect();
        Self {
            launches: Arc::new(launches),
            by_id: Arc::new(by_id),
        }
    }

    /// The catalog shipped with the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled JSON is malformed.
    pub fn bundled() -> Result<Self, DataSourceError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Parse a JSON array of launches.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a launch array.
    pub fn from_json(json: &str) -> Result<Self, DataSourceError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Load a JSON array of launches from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, DataSourceError> {
        let json = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json(&json)?;
        info!(path = %path.display(), launches = catalog.launches.len(), "loaded launch catalog");
        Ok(catalog)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.launches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.launches.is_empty()
    }
}

#[async_trait]
impl LaunchCatalog for StaticLaunchCatalog {
    async fn get_all(&self) -> Result<Vec<Launch>, DataSourceError> {
        Ok(self.launches.as_ref().clone())
    }

    async fn get_by_id(&self, id: &LaunchId) -> Result<Option<Launch>, DataSourceError> {
        Ok(self
            .by_id
            .get(id)
            .and_then(|&i| self.launches.get(i))
            .cloned())
    }
}

/// Cache key for catalog lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    All,
    Launch(LaunchId),
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    All(Arc<Vec<Launch>>),
    Launch(Option<Box<Launch>>),
}

/// Caches another catalog's answers for a fixed TTL.
///
/// Misses are cached too, so an unknown id costs one upstream lookup per TTL.
#[derive(Clone)]
pub struct CachedLaunchCatalog {
    upstream: Arc<dyn LaunchCatalog>,
    cache: Cache<CacheKey, CacheValue>,
}

impl CachedLaunchCatalog {
    #[must_use]
    pub fn new(upstream: Arc<dyn LaunchCatalog>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .build();
        Self { upstream, cache }
    }
}

#[async_trait]
impl LaunchCatalog for CachedLaunchCatalog {
    #[instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<Launch>, DataSourceError> {
        if let Some(CacheValue::All(launches)) = self.cache.get(&CacheKey::All).await {
            debug!("Cache hit for launch catalog");
            return Ok(launches.as_ref().clone());
        }

        let launches = self.upstream.get_all().await?;
        self.cache
            .insert(CacheKey::All, CacheValue::All(Arc::new(launches.clone())))
            .await;
        Ok(launches)
    }

    #[instrument(skip(self), fields(launch_id = %id))]
    async fn get_by_id(&self, id: &LaunchId) -> Result<Option<Launch>, DataSourceError> {
        let key = CacheKey::Launch(id.clone());
        if let Some(CacheValue::Launch(launch)) = self.cache.get(&key).await {
            debug!("Cache hit for launch");
            return Ok(launch.map(|l| *l));
        }

        let launch = self.upstream.get_by_id(id).await?;
        self.cache
            .insert(key, CacheValue::Launch(launch.clone().map(Box::new)))
            .await;
        Ok(launch)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Counts upstream lookups.
    struct Counting {
        inner: StaticLaunchCatalog,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LaunchCatalog for Counting {
        async fn get_all(&self) -> Result<Vec<Launch>, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_all().await
        }

        async fn get_by_id(&self, id: &LaunchId) -> Result<Option<Launch>, DataSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_id(id).await
        }
    }

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = StaticLaunchCatalog::bundled().unwrap();
        assert!(catalog.len() > 20);
    }

    #[tokio::test]
    async fn test_get_all_is_oldest_first() {
        let launches = StaticLaunchCatalog::bundled().unwrap().get_all().await.unwrap();
        assert!(launches.windows(2).all(|w| w[0].launched_at <= w[1].launched_at));
    }

    #[tokio::test]
    async fn test_get_many_keeps_order_and_skips_unknown() {
        let catalog = StaticLaunchCatalog::bundled().unwrap();
        let ids = [LaunchId::from("3"), LaunchId::from("nope"), LaunchId::from("1")];
        let found = catalog.get_many(&ids).await.unwrap();
        let found: Vec<&str> = found.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(found, vec!["3", "1"]);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launches.json");
        tokio::fs::write(&path, BUNDLED_CATALOG).await.unwrap();
        let catalog = StaticLaunchCatalog::load(&path).await.unwrap();
        assert_eq!(catalog.len(), StaticLaunchCatalog::bundled().unwrap().len());
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launches.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        assert!(matches!(
            StaticLaunchCatalog::load(&path).await,
            Err(DataSourceError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_cached_catalog_hits_upstream_once() {
        let upstream = Arc::new(Counting {
            inner: StaticLaunchCatalog::bundled().unwrap(),
            calls: AtomicUsize::new(0),
        });
        let cached = CachedLaunchCatalog::new(upstream.clone(), Duration::from_secs(60));

        let id = LaunchId::from("1");
        let first = cached.get_by_id(&id).await.unwrap();
        let second = cached.get_by_id(&id).await.unwrap();
        assert_eq!(first, second);
        assert!(cached.get_by_id(&LaunchId::from("nope")).await.unwrap().is_none());
        assert!(cached.get_by_id(&LaunchId::from("nope")).await.unwrap().is_none());

        cached.get_all().await.unwrap();
        cached.get_all().await.unwrap();

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
    }
}
