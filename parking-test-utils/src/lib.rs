//! Parkings Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for parking ids and occupancy values
//! - In-memory cache and store doubles wired into an [`OccupancyCache`]

use std::sync::Arc;

// Re-export the in-memory doubles from their source crate
pub use parking_storage::{CacheConfig, InMemoryCache, InMemoryOccupancyStore, OccupancyCache};

pub use parking_core::{Occupancy, ParkingId};

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for occupancy writes.

    use super::*;
    use proptest::prelude::*;

    /// Generate a positive parking id.
    pub fn arb_parking_id() -> impl Strategy<Value = ParkingId> {
        1..=i32::MAX
    }

    /// Generate an occupancy that fits the integer column.
    pub fn arb_occupancy() -> impl Strategy<Value = Occupancy> {
        0..=(i32::MAX as Occupancy)
    }

    /// Generate a sequence of occupancy writes for a single parking.
    pub fn arb_occupancy_writes(max_len: usize) -> impl Strategy<Value = Vec<Occupancy>> {
        proptest::collection::vec(arb_occupancy(), 1..=max_len)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! In-memory occupancy wiring shared by handler and router tests.

    use super::*;

    /// In-memory cache and store behind an [`OccupancyCache`].
    pub struct OccupancyFixture {
        pub cache: Arc<InMemoryCache>,
        pub store: Arc<InMemoryOccupancyStore>,
        pub occupancy: OccupancyCache,
    }

    impl OccupancyFixture {
        pub fn new() -> Self {
            let cache = Arc::new(InMemoryCache::new());
            let store = Arc::new(InMemoryOccupancyStore::new());
            let occupancy = OccupancyCache::new(cache.clone(), store.clone(), CacheConfig::default());
            Self {
                cache,
                store,
                occupancy,
            }
        }
    }

    impl Default for OccupancyFixture {
        fn default() -> Self {
            Self::new()
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::fixtures::OccupancyFixture;
    use super::generators::*;
    use parking_core::StorageError;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_fixture_shares_its_doubles() -> Result<(), StorageError> {
        let fixture = OccupancyFixture::new();
        fixture.store.insert_parking(2, Some(5));

        assert_eq!(fixture.occupancy.read(2).await?, 5);
        assert_eq!(fixture.cache.peek("parking:2:occupancy").as_deref(), Some("5"));
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_generated_occupancy_fits_column(value in arb_occupancy()) {
            prop_assert!(parking_core::occupancy_to_column(value).is_ok());
        }

        #[test]
        fn prop_generated_writes_are_non_empty(writes in arb_occupancy_writes(4)) {
            prop_assert!(!writes.is_empty() && writes.len() <= 4);
        }
    }
}
