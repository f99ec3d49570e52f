//! Occupancy cache-aside store.
//!
//! Mediates the per-parking occupancy counter between a key-value cache and
//! the durable store:
//!
//! - `update` writes the cache first (best effort), then the store. The store
//!   decides the outcome. A failed store write leaves the cache entry in
//!   place; there is no rollback.
//! - `read` answers from the cache when it can. On a miss it reads the store
//!   and repopulates the cache (best effort).
//!
//! Cache failures never reach the caller. They are logged and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_core::{EntityKind, Occupancy, ParkingId, StorageError};

use super::key::{OccupancyKey, DEFAULT_KEY_PREFIX};
use super::traits::{CacheClient, CacheStats, OccupancyStore};

/// Configuration for the occupancy cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Namespace of occupancy keys.
    pub key_prefix: String,
    /// Expiry of cache entries. `None` keeps entries until overwritten.
    pub entry_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            entry_ttl: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key namespace.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = Some(ttl);
        self
    }

    pub fn key_for(&self, id: ParkingId) -> OccupancyKey {
        OccupancyKey::new(&self.key_prefix, id)
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    cache_failures: AtomicU64,
    repopulations: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cache-aside store for parking occupancy.
///
/// Holds no per-request state and takes no locks; concurrent updates to the
/// same parking race and the last store write wins.
#[derive(Clone)]
pub struct OccupancyCache {
    cache: Arc<dyn CacheClient>,
    store: Arc<dyn OccupancyStore>,
    config: CacheConfig,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for OccupancyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OccupancyCache")
            .field("cache", &self.cache.backend_name())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl OccupancyCache {
    /// Create a new occupancy cache.
    pub fn new(cache: Arc<dyn CacheClient>, store: Arc<dyn OccupancyStore>, config: CacheConfig) -> Self {
        Self {
            cache,
            store,
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create a new occupancy cache with default configuration.
    pub fn with_defaults(cache: Arc<dyn CacheClient>, store: Arc<dyn OccupancyStore>) -> Self {
        Self::new(cache, store, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    /// Record a new occupancy for parking `id`.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` when the store has no such parking. The
    ///   cache entry written in the first step stays in place.
    /// - Any other store failure is returned unchanged.
    pub async fn update(&self, id: ParkingId, occupancy: Occupancy) -> Result<(), StorageError> {
        let key = self.config.key_for(id);
        self.write_cache(&key, occupancy).await;

        let rows = self.store.update_occupancy(id, occupancy).await?;
        if rows == 0 {
            tracing::debug!(parking_id = id, key = %key, "Occupancy update hit no rows; cache entry left in place");
            return Err(StorageError::not_found(EntityKind::Parking, id));
        }

        tracing::debug!(parking_id = id, occupancy, "Occupancy updated");
        Ok(())
    }

    /// Current occupancy of parking `id`.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` on a cache miss when the parking is missing
    ///   from the store or its occupancy is null.
    /// - Any store failure during the fallback read.
    pub async fn read(&self, id: ParkingId) -> Result<Occupancy, StorageError> {
        let key = self.config.key_for(id);

        match self.cache.get(key.as_str()).await {
            Ok(Some(raw)) => match raw.trim().parse::<Occupancy>() {
                Ok(value) => {
                    Counters::bump(&self.counters.hits);
                    return Ok(value);
                }
                Err(_) => {
                    tracing::warn!(key = %key, value = %raw, "Unparseable cached occupancy; reading store");
                }
            },
            Ok(None) => {}
            Err(e) => {
                Counters::bump(&self.counters.cache_failures);
                tracing::warn!(key = %key, error = %e, "Occupancy cache read failed; reading store");
            }
        }

        Counters::bump(&self.counters.misses);

        let value = self
            .store
            .get_occupancy(id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityKind::Parking, id))?;

        if self.write_cache(&key, value).await {
            Counters::bump(&self.counters.repopulations);
        }

        Ok(value)
    }

    /// Overwrite the cache entry after a store write made elsewhere.
    pub async fn refresh(&self, id: ParkingId, occupancy: Occupancy) {
        let key = self.config.key_for(id);
        self.write_cache(&key, occupancy).await;
    }

    /// Probe the cache backend.
    pub async fn cache_health(&self) -> Result<(), parking_core::CacheError> {
        self.cache.ping().await
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            cache_failures: self.counters.cache_failures.load(Ordering::Relaxed),
            repopulations: self.counters.repopulations.load(Ordering::Relaxed),
        }
    }

    /// Best-effort cache write. Returns whether the write landed.
    async fn write_cache(&self, key: &OccupancyKey, value: Occupancy) -> bool {
        let encoded = value.to_string();
        let result = match self.config.entry_ttl {
            Some(ttl) => self.cache.set_with_ttl(key.as_str(), &encoded, ttl).await,
            None => self.cache.set(key.as_str(), &encoded).await,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                Counters::bump(&self.counters.cache_failures);
                tracing::warn!(key = %key, error = %e, "Occupancy cache write failed; continuing");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::{InMemoryCache, InMemoryOccupancyStore};
    use proptest::prelude::*;

    fn setup() -> (Arc<InMemoryCache>, Arc<InMemoryOccupancyStore>, OccupancyCache) {
        let cache = Arc::new(InMemoryCache::new());
        let store = Arc::new(InMemoryOccupancyStore::new());
        let occupancy = OccupancyCache::with_defaults(cache.clone(), store.clone());
        (cache, store, occupancy)
    }

    #[tokio::test]
    async fn test_write_then_read_coherence() -> Result<(), StorageError> {
        let (_cache, store, occupancy) = setup();
        store.insert_parking(1, Some(0));

        occupancy.update(1, 17).await?;
        assert_eq!(occupancy.read(1).await?, 17);
        assert_eq!(store.occupancy_of(1), Some(Some(17)));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_then_read_without_cache() -> Result<(), StorageError> {
        let (cache, store, occupancy) = setup();
        store.insert_parking(1, Some(0));
        cache.set_reachable(false);

        occupancy.update(1, 8).await?;
        assert_eq!(occupancy.read(1).await?, 8);
        assert_eq!(occupancy.stats().cache_failures, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_miss_repopulates_cache() -> Result<(), StorageError> {
        let (cache, store, occupancy) = setup();
        store.insert_parking(5, Some(23));

        assert_eq!(cache.peek("parking:5:occupancy"), None);
        assert_eq!(occupancy.read(5).await?, 23);
        assert_eq!(cache.peek("parking:5:occupancy"), Some("23".to_string()));

        let stats = occupancy.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.repopulations, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_tolerates_cache_failure() -> Result<(), StorageError> {
        let (cache, store, occupancy) = setup();
        store.insert_parking(2, Some(1));

        cache.set_reachable(false);
        occupancy.update(2, 11).await?;
        assert_eq!(store.occupancy_of(2), Some(Some(11)));

        cache.set_reachable(true);
        assert!(cache.is_empty());
        assert_eq!(occupancy.read(2).await?, 11);
        assert_eq!(store.read_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_parking_is_not_found() {
        let (cache, _store, occupancy) = setup();

        let update = occupancy.update(404, 3).await;
        assert!(matches!(update, Err(StorageError::NotFound { .. })));
        // Cache keeps the value written before the store refused it.
        assert_eq!(cache.peek("parking:404:occupancy"), Some("3".to_string()));

        let (_cache, _store, occupancy) = setup();
        let read = occupancy.read(404).await;
        assert!(matches!(read, Err(StorageError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_null_occupancy_is_not_found() {
        let (cache, store, occupancy) = setup();
        store.insert_parking(6, None);

        assert!(matches!(occupancy.read(6).await, Err(StorageError::NotFound { .. })));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_store() -> Result<(), StorageError> {
        let (cache, store, occupancy) = setup();
        store.insert_parking(3, Some(2));
        occupancy.update(3, 9).await?;

        store.set_available(false);
        assert_eq!(occupancy.read(3).await?, 9);
        assert_eq!(store.read_count(), 0);
        assert_eq!(cache.get_calls(), 1);
        assert_eq!(occupancy.stats().hits, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_update_is_idempotent() -> Result<(), StorageError> {
        let (cache, store, occupancy) = setup();
        store.insert_parking(4, Some(0));

        occupancy.update(4, 12).await?;
        let cached_once = cache.peek("parking:4:occupancy");
        let stored_once = store.occupancy_of(4);

        occupancy.update(4, 12).await?;
        assert_eq!(cache.peek("parking:4:occupancy"), cached_once);
        assert_eq!(store.occupancy_of(4), stored_once);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_without_rollback() {
        let (cache, store, occupancy) = setup();
        store.insert_parking(7, Some(1));
        store.set_available(false);

        let result = occupancy.update(7, 30).await;
        assert!(matches!(result, Err(StorageError::Store { .. })));
        assert_eq!(cache.peek("parking:7:occupancy"), Some("30".to_string()));
    }

    #[tokio::test]
    async fn test_unparseable_entry_treated_as_miss() -> Result<(), StorageError> {
        let (cache, store, occupancy) = setup();
        store.insert_parking(8, Some(4));
        cache.insert_raw("parking:8:occupancy", "not-a-number");

        assert_eq!(occupancy.read(8).await?, 4);
        assert_eq!(cache.peek("parking:8:occupancy"), Some("4".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_prefix_and_ttl() -> Result<(), StorageError> {
        let cache = Arc::new(InMemoryCache::new());
        let store = Arc::new(InMemoryOccupancyStore::new());
        let config = CacheConfig::new()
            .with_key_prefix("lot")
            .with_ttl(Duration::from_secs(60));
        let occupancy = OccupancyCache::new(cache.clone(), store.clone(), config);
        store.insert_parking(1, Some(0));

        occupancy.update(1, 2).await?;
        assert_eq!(cache.peek("lot:1:occupancy"), Some("2".to_string()));
        assert_eq!(cache.peek("parking:1:occupancy"), None);
        Ok(())
    }

    #[derive(Debug, Clone)]
    enum Step {
        Update(Occupancy),
        Read,
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![(0u32..500).prop_map(Step::Update), Just(Step::Read)]
    }

    proptest! {
        /// With the cache either healthy or down for the whole run, a read
        /// returns the last acknowledged update.
        #[test]
        fn prop_read_returns_last_update(
            initial in 0u32..500,
            cache_reachable in any::<bool>(),
            steps in prop::collection::vec(arb_step(), 1..40),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            runtime.block_on(async {
                let (cache, store, occupancy) = setup();
                store.insert_parking(1, Some(initial));
                cache.set_reachable(cache_reachable);
                let mut expected = initial;

                for step in steps {
                    match step {
                        Step::Update(value) => {
                            occupancy.update(1, value).await.map_err(|e| TestCaseError::fail(e.to_string()))?;
                            expected = value;
                        }
                        Step::Read => {
                            let value = occupancy.read(1).await.map_err(|e| TestCaseError::fail(e.to_string()))?;
                            prop_assert_eq!(value, expected);
                        }
                    }
                }
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
