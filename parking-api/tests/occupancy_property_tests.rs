//! Property tests for the occupancy endpoints over generated write sequences.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use parking_test_utils::generators::{arb_occupancy_writes, arb_parking_id};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use serde_json::{json, Value as JsonValue};
use tokio::runtime::Runtime;
use tower::ServiceExt;

#[path = "support/app.rs"]
mod test_app_support;
use test_app_support::{test_app, TestApp};

fn test_runtime() -> Result<Runtime, TestCaseError> {
    Runtime::new().map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

async fn call(app: &TestApp, request: Request<Body>) -> Result<(StatusCode, JsonValue), TestCaseError> {
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| TestCaseError::fail(format!("Request failed: {:?}", e)))?;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let json = serde_json::from_slice(&body).map_err(|e| TestCaseError::fail(e.to_string()))?;
    Ok((status, json))
}

fn patch(id: i32, occupancy: u32) -> Result<Request<Body>, TestCaseError> {
    Request::builder()
        .method("PATCH")
        .uri(format!("/cv/occupancy/{}", id))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "occupancy": occupancy }).to_string()))
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

fn status(id: i32) -> Result<Request<Body>, TestCaseError> {
    Request::builder()
        .uri(format!("/cv/parking/{}/status", id))
        .body(Body::empty())
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The last accepted write is what every later read returns, whether the
    /// cache is reachable or not.
    #[test]
    fn prop_last_write_wins(
        id in arb_parking_id(),
        writes in arb_occupancy_writes(8),
        cache_up in any::<bool>(),
    ) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let app = test_app();
            app.store.insert_parking(id, None);
            app.cache.set_reachable(cache_up);

            for value in &writes {
                let (code, _) = call(&app, patch(id, *value)?).await?;
                prop_assert_eq!(code, StatusCode::OK);
            }

            let last = writes.last().copied().unwrap_or_default();
            let (code, body) = call(&app, status(id)?).await?;
            prop_assert_eq!(code, StatusCode::OK);
            prop_assert_eq!(&body["occupancy"], &json!(last));
            prop_assert_eq!(app.store.occupancy_of(id), Some(Some(last)));
            Ok(())
        })?;
    }

    /// Writes to an unknown parking are rejected and never create a row.
    #[test]
    fn prop_unknown_parking_never_created(id in arb_parking_id(), writes in arb_occupancy_writes(4)) {
        let rt = test_runtime()?;
        rt.block_on(async {
            let app = test_app();

            for value in &writes {
                let (code, _) = call(&app, patch(id, *value)?).await?;
                prop_assert_eq!(code, StatusCode::NOT_FOUND);
            }
            prop_assert_eq!(app.store.occupancy_of(id), None);
            Ok(())
        })?;
    }
}
