//! In-memory cache and store.
//!
//! `InMemoryCache` backs the service when no Redis URL is configured; both
//! types double as test collaborators and can be switched into a failing
//! state to exercise degradation paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_core::{CacheError, Occupancy, ParkingId, StorageError};

use super::traits::{CacheClient, OccupancyStore};

// ============================================================================
// IN-MEMORY CACHE
// ============================================================================

#[derive(Debug, Clone)]
struct CachedValue {
    value: String,
    expires_at: Option<Instant>,
    inserted_at: Instant,
}

impl CachedValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local cache with optional per-entry expiry.
///
/// A bounded cache holds at most `max_entries` keys. Adding a new key to a
/// full cache drops expired entries first, then the oldest insertion.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, CachedValue>>,
    max_entries: Option<usize>,
    reachable: AtomicBool,
    get_calls: AtomicU64,
    set_calls: AtomicU64,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    /// Unbounded cache.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Cache holding at most `max_entries` keys (at least one).
    pub fn bounded(max_entries: usize) -> Self {
        Self::build(Some(max_entries.max(1)))
    }

    fn build(max_entries: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries,
            reachable: AtomicBool::new(true),
            get_calls: AtomicU64::new(0),
            set_calls: AtomicU64::new(0),
        }
    }

    /// Simulate the cache going down (`false`) or coming back (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Read an entry without counting it as a client call.
    pub fn peek(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    /// Seed an entry directly, bypassing reachability.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.write() {
            self.store_entry(&mut entries, key, value, None);
        }
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_calls(&self) -> u64 {
        self.get_calls.load(Ordering::Relaxed)
    }

    pub fn set_calls(&self) -> u64 {
        self.set_calls.load(Ordering::Relaxed)
    }

    fn ensure_reachable(&self) -> Result<(), CacheError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable {
                reason: "in-memory cache marked unreachable".to_string(),
            })
        }
    }

    fn write(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::Relaxed);
        self.ensure_reachable()?;

        let mut entries = self.entries.write().map_err(|_| CacheError::Command {
            key: key.to_string(),
            reason: "cache lock poisoned".to_string(),
        })?;
        self.store_entry(&mut entries, key, value, ttl);
        Ok(())
    }

    fn store_entry(
        &self,
        entries: &mut HashMap<String, CachedValue>,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) {
        let now = Instant::now();
        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(key) {
                Self::make_room(entries, max, now);
            }
        }
        entries.insert(
            key.to_string(),
            CachedValue {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| now + ttl),
                inserted_at: now,
            },
        );
    }

    fn make_room(entries: &mut HashMap<String, CachedValue>, max: usize, now: Instant) {
        entries.retain(|_, entry| entry.is_live(now));
        while entries.len() >= max {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                    tracing::debug!(key = %key, "Evicted oldest in-memory cache entry");
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl CacheClient for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        self.ensure_reachable()?;

        let entries = self.entries.read().map_err(|_| CacheError::Command {
            key: key.to_string(),
            reason: "cache lock poisoned".to_string(),
        })?;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.write(key, value, None)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.write(key, value, Some(ttl))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// Occupancy column of a set of parkings, kept in memory.
#[derive(Debug)]
pub struct InMemoryOccupancyStore {
    records: RwLock<HashMap<ParkingId, Option<Occupancy>>>,
    available: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl Default for InMemoryOccupancyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOccupancyStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Create or replace a parking row.
    pub fn insert_parking(&self, id: ParkingId, occupancy: Option<Occupancy>) {
        if let Ok(mut records) = self.records.write() {
            records.insert(id, occupancy);
        }
    }

    /// Current row state: `None` if the parking does not exist.
    pub fn occupancy_of(&self, id: ParkingId) -> Option<Option<Occupancy>> {
        self.records.read().ok()?.get(&id).copied()
    }

    /// Make every call fail with a store error while `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn ensure_available(&self, operation: &str) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::store(operation, "store unavailable"))
        }
    }
}

#[async_trait]
impl OccupancyStore for InMemoryOccupancyStore {
    async fn update_occupancy(&self, id: ParkingId, occupancy: Occupancy) -> Result<u64, StorageError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.ensure_available("update_occupancy")?;

        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        match records.get_mut(&id) {
            Some(slot) => {
                *slot = Some(occupancy);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn get_occupancy(&self, id: ParkingId) -> Result<Option<Occupancy>, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.ensure_available("get_occupancy")?;

        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(&id).copied().flatten())
    }
}
