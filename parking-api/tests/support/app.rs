use std::sync::Arc;

use axum::Router;
use parking_api::{create_api_router, ApiConfig, AppState, AuthConfig, DbClient, DbConfig};
use parking_storage::{InMemoryCache, InMemoryOccupancyStore};
use parking_test_utils::fixtures::OccupancyFixture;

/// Router wired to in-memory occupancy doubles. The database pool is lazy
/// and points at a closed port, so only routes that skip the database work.
pub struct TestApp {
    pub cache: Arc<InMemoryCache>,
    pub store: Arc<InMemoryOccupancyStore>,
    pub router: Router,
}

pub fn test_app() -> TestApp {
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

    let state = AppState::new(db, occupancy, Arc::new(AuthConfig::default()));
    let router =
        create_api_router(state, &ApiConfig::default()).expect("router should build outside production");

    TestApp {
        cache,
        store,
        router,
    }
}
