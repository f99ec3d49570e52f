//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use parking_storage::OccupancyCache;

use crate::auth::AuthConfig;
use crate::db::DbClient;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: DbClient,
    /// Cache-aside occupancy store; the only path for CV occupancy traffic.
    pub occupancy: OccupancyCache,
    pub auth: Arc<AuthConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(db: DbClient, occupancy: OccupancyCache, auth: Arc<AuthConfig>) -> Self {
        Self {
            db,
            occupancy,
            auth,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(DbClient, db);
crate::impl_from_ref!(OccupancyCache, occupancy);
crate::impl_from_ref!(Arc<AuthConfig>, auth);
crate::impl_from_ref!(Instant, start_time);

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::db::DbConfig;
    use parking_storage::{InMemoryCache, InMemoryOccupancyStore};
    use parking_test_utils::fixtures::OccupancyFixture;

    /// In-memory collaborators behind an [`AppState`]. The database pool never
    /// connects unless a handler touches it.
    pub(crate) struct TestHarness {
        pub cache: Arc<InMemoryCache>,
        pub store: Arc<InMemoryOccupancyStore>,
        pub state: AppState,
    }

    pub(crate) fn harness() -> TestHarness {
        let OccupancyFixture {
            cache,
            store,
            occupancy,
        } = OccupancyFixture::new();
        let db = DbClient::from_config(&DbConfig {
            port: 1,
            ..Default::default()
        })
        .expect("lazy pool creation should not fail");

        TestHarness {
            cache,
            store,
            state: AppState::new(db, occupancy, Arc::new(AuthConfig::default())),
        }
    }
}
