use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use home_inventory::routes::build_router;
use home_inventory::state::AppState;
use home_inventory_core::HomeInventoryCore;
use home_inventory_ledger::Ledger;
use home_inventory_planner::{HeuristicPlanner, RecommendationEngine};
use home_inventory_queue::JobQueue;
use home_inventory_shared::{Clock, IdProvider, SystemClock, UuidIds};
use home_inventory_shopping::ShoppingStore;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_state() -> AppState {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdProvider> = Arc::new(UuidIds);

    let queue = Arc::new(JobQueue::new(
        "https://uploads.example.test".to_string(),
        3,
        clock.clone(),
        ids.clone(),
    ));
    let ledger = Arc::new(Ledger::new(clock.clone(), ids.clone()));
    let planner = Box::new(HeuristicPlanner::new(ids.clone()));
    let recommendations = Arc::new(RecommendationEngine::new(planner, clock.clone(), ids.clone()));
    let shopping = Arc::new(ShoppingStore::new(clock.clone(), ids.clone()));

    let core = Arc::new(HomeInventoryCore::new(
        queue,
        ledger,
        recommendations,
        shopping,
        clock,
        ids,
    ));
    AppState::new(core, Some("test-worker-secret".to_string()))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_is_unauthenticated_and_ok() {
    let app = build_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// End-to-end: add manual inventory over HTTP, then read it back through
/// the inventory snapshot and pantry-health routes.
#[tokio::test]
async fn manual_items_flow_through_inventory_and_pantry_health() {
    let app = build_router(test_state());
    let household_id = "house_http_1";

    let add_body = json!({
        "items": [{
            "itemKey": "milk",
            "rawName": "Whole Milk",
            "normalizedName": "milk",
            "quantity": 2.0,
            "unit": "l",
            "category": "dairy",
            "unitPrice": 1.5
        }],
        "purchasedAt": null,
        "notes": "integration test",
        "idempotencyKey": null
    });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/inventory/{household_id}/manual-items"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(add_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let outcome = body_json(response).await;
    assert_eq!(outcome["applied"], true);
    assert_eq!(outcome["lotIds"].as_array().unwrap().len(), 1);

    let snapshot_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/inventory/{household_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(snapshot_response.status(), StatusCode::OK);
    let lots = body_json(snapshot_response).await;
    assert_eq!(lots.as_array().unwrap().len(), 1);

    let health_response = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/pantry-health/{household_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(health_response.status(), StatusCode::OK);
    let health = body_json(health_response).await;
    assert!(health["score"].as_f64().is_some());
}

/// Worker-token gating: `/internal/*` rejects requests with a missing
/// or wrong shared secret.
#[tokio::test]
async fn internal_routes_reject_missing_worker_token() {
    let app = build_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/internal/jobs/claim")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn internal_routes_accept_correct_worker_token() {
    let app = build_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/internal/jobs/claim")
                .header("x-home-inventory-worker-token", "test-worker-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
