//! End-to-end smoke tests against a live PostgreSQL and Redis.
//!
//! Run with `--features db-tests` after loading the parkings schema.

#![cfg(feature = "db-tests")]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use parking_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, CreateParkingRequest,
    FavoriteRequest, UpdateParkingRequest,
};
use parking_core::Coordinates;
use parking_storage::{CacheConfig, InMemoryCache, OccupancyCache, RedisCache};
use tower::ServiceExt;

#[path = "support/db.rs"]
mod test_db_support;
use test_db_support::test_db_client;

fn sample_parking() -> CreateParkingRequest {
    CreateParkingRequest {
        description: Some("smoke test".to_string()),
        coordinates: Coordinates::new(55.7558, 37.6173),
        name: Some("Smoke Parking".to_string()),
        name_obj: None,
        adm_area: None,
        district: None,
        occupancy: Some(0),
    }
}

#[tokio::test]
async fn smoke_test_parking_crud_chain() -> ApiResult<()> {
    let db = test_db_client();
    db.health_check().await?;

    let created = db.parking_create(&sample_parking()).await?;
    let fetched = db.parking_get(created.id).await?;
    assert_eq!(fetched.as_ref().map(|p| p.coordinates), Some(created.coordinates));

    let updated = db
        .parking_update(
            created.id,
            &UpdateParkingRequest {
                district: Some("Tverskoy".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.map(|u| u.id), Some(created.id));

    assert_eq!(db.parking_delete(created.id).await?, Some(created.id));
    assert!(db.parking_get(created.id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn smoke_test_occupancy_cache_aside() -> ApiResult<()> {
    let db = test_db_client();
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let cache = RedisCache::open(&redis_url).map_err(|e| ApiError::internal_error(e.to_string()))?;
    let occupancy = OccupancyCache::new(Arc::new(cache), Arc::new(db.clone()), CacheConfig::default());

    let created = db.parking_create(&sample_parking()).await?;

    occupancy.update(created.id, 17).await?;
    assert_eq!(occupancy.read(created.id).await?, 17);
    assert_eq!(
        db.parking_get(created.id).await?.and_then(|p| p.occupancy),
        Some(17)
    );

    db.parking_delete(created.id).await?;
    Ok(())
}

#[tokio::test]
async fn smoke_test_put_occupancy_refreshes_cache() -> ApiResult<()> {
    let db = test_db_client();
    let cache = Arc::new(InMemoryCache::new());
    let occupancy = OccupancyCache::new(cache.clone(), Arc::new(db.clone()), CacheConfig::default());
    let state = AppState::new(db.clone(), occupancy.clone(), Arc::new(AuthConfig::default()));
    let router = create_api_router(state, &ApiConfig::default())?;

    let created = db.parking_create(&sample_parking()).await?;
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/parking/{}", created.id))
        .header("content-type", "application/json")
        .body(Body::from(r#"{"occupancy": 23}"#))
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let response = router
        .oneshot(request)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    assert_eq!(response.status(), StatusCode::OK);

    let key = CacheConfig::default().key_for(created.id);
    assert_eq!(cache.peek(key.as_str()).as_deref(), Some("23"));
    assert_eq!(occupancy.read(created.id).await?, 23);

    db.parking_delete(created.id).await?;
    Ok(())
}

#[tokio::test]
async fn smoke_test_favorite_duplicate_is_conflict() -> ApiResult<()> {
    let db = test_db_client();
    let parking = db.parking_create(&sample_parking()).await?;

    let users = db.user_list().await?;
    let Some(user) = users.first() else {
        db.parking_delete(parking.id).await?;
        return Ok(());
    };

    let req = FavoriteRequest {
        id_user: user.id,
        id_parking: parking.id,
    };
    db.favorite_add(&req).await?;
    let duplicate = db.favorite_add(&req).await;
    assert_eq!(
        duplicate.map_err(|e| e.status_code()).err(),
        Some(axum::http::StatusCode::CONFLICT)
    );

    db.favorite_remove(&req).await?;
    db.parking_delete(parking.id).await?;
    Ok(())
}
