//! Collaborator traits for the occupancy cache-aside store.
//!
//! The cache and the durable store are injected as trait objects so the
//! component can run against Redis/PostgreSQL in production and against the
//! in-memory doubles in tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_core::{CacheError, Occupancy, ParkingId, StorageError};

/// Key-value cache client.
///
/// Every call may fail; callers on the occupancy path treat failures as
/// misses (reads) or ignore them (writes).
#[async_trait]
pub trait CacheClient: Send + Sync {
    /// Get the string value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` with no expiration.
    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;

    /// Store `value` under `key`, expiring after `ttl`.
    ///
    /// Backends without expiry support fall back to a plain `set`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let _ = ttl;
        self.set(key, value).await
    }

    /// Round-trip check used by readiness probes.
    async fn ping(&self) -> Result<(), CacheError> {
        self.get("health:ping").await.map(|_| ())
    }

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

/// Durable store holding the authoritative occupancy per parking.
#[async_trait]
pub trait OccupancyStore: Send + Sync {
    /// Set the occupancy column of parking `id`.
    ///
    /// Returns the number of rows affected; zero means the parking does not
    /// exist.
    async fn update_occupancy(&self, id: ParkingId, occupancy: Occupancy) -> Result<u64, StorageError>;

    /// Read the occupancy column of parking `id`.
    ///
    /// Returns `None` both when the parking does not exist and when its
    /// occupancy is null.
    async fn get_occupancy(&self, id: ParkingId) -> Result<Option<Occupancy>, StorageError>;
}

/// Statistics about occupancy cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from the cache.
    pub hits: u64,
    /// Reads that fell through to the store.
    pub misses: u64,
    /// Cache calls that failed and were swallowed.
    pub cache_failures: u64,
    /// Entries rebuilt from the store after a miss.
    pub repopulations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
