//! Occupancy cache layer.
//!
//! A cache-aside store for the per-parking occupancy counter. Writes go to
//! the cache and then to the durable store; reads prefer the cache and
//! rebuild missing entries from the store.
//!
//! # Degradation
//!
//! The cache is an optimization. When it is unreachable, updates still
//! succeed against the store and reads are served from the store. Callers
//! never see a cache error.
//!
//! # Example
//!
//! ```ignore
//! let occupancy = OccupancyCache::with_defaults(Arc::new(redis), Arc::new(db));
//!
//! occupancy.update(parking_id, 12).await?;
//! let current = occupancy.read(parking_id).await?;
//! ```

pub mod key;
pub mod memory;
pub mod occupancy;
pub mod redis_backend;
pub mod traits;

pub use key::{OccupancyKey, DEFAULT_KEY_PREFIX};
pub use memory::{InMemoryCache, InMemoryOccupancyStore};
pub use occupancy::{CacheConfig, OccupancyCache};
pub use redis_backend::{RedisCache, RedisCacheConfig};
pub use traits::{CacheClient, CacheStats, OccupancyStore};
