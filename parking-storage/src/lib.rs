//! Parkings Storage
//!
//! Storage seams for the parkings platform: the cache and durable-store
//! traits, the occupancy cache-aside component built on them, and the Redis
//! and in-memory backends.

pub mod cache;

pub use cache::{
    CacheClient, CacheConfig, CacheStats, InMemoryCache, InMemoryOccupancyStore, OccupancyCache,
    OccupancyKey, OccupancyStore, RedisCache, RedisCacheConfig, DEFAULT_KEY_PREFIX,
};
