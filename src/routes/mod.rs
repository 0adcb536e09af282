mod checkins;
mod health;
mod internal;
mod inventory;
mod jobs;
mod pantry_health;
mod receipts;
mod recommendations;
mod shopping;

use axum::Router;
use axum::middleware;
use axum::routing::{get, patch, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::worker_auth_middleware;
use crate::state::AppState;

/// Assembles the full HTTP surface: the public `/v1/*` API plus the
/// worker-only `/internal/*` surface gated by [`worker_auth_middleware`].
pub fn build_router(state: AppState) -> Router {
    let internal_routes = Router::new()
        .route("/jobs/claim", post(internal::claim))
        .route("/jobs/{jobId}/result", post(internal::submit_result))
        .route("/jobs/{jobId}/fail", post(internal::fail))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            worker_auth_middleware,
        ));

    let v1_routes = Router::new()
        .route("/receipts/upload-url", post(receipts::upload_url))
        .route("/receipts/batch/process", post(receipts::batch_process))
        .route("/receipts/{receiptUploadId}", get(receipts::get_receipt))
        .route("/receipts/{receiptUploadId}/process", post(receipts::process))
        .route("/receipts/{receiptUploadId}/review", put(receipts::review))
        .route("/jobs/{jobId}", get(jobs::get_job))
        .route("/inventory/{householdId}", get(inventory::snapshot))
        .route(
            "/inventory/{householdId}/manual-items",
            post(inventory::manual_items),
        )
        .route(
            "/inventory/{householdId}/lots/{lotId}/expiry",
            post(inventory::override_expiry),
        )
        .route(
            "/inventory/{householdId}/expiry-risk",
            get(inventory::expiry_risk),
        )
        .route(
            "/recommendations/{householdId}/daily",
            get(recommendations::latest_daily),
        )
        .route(
            "/recommendations/{householdId}/daily/generate",
            post(recommendations::generate_daily),
        )
        .route(
            "/recommendations/{householdId}/weekly",
            get(recommendations::latest_weekly),
        )
        .route(
            "/recommendations/{householdId}/weekly/generate",
            post(recommendations::generate_weekly),
        )
        .route(
            "/recommendations/{recommendationId}/feedback",
            post(recommendations::submit_feedback),
        )
        .route(
            "/checkins/{householdId}/pending",
            get(checkins::list_pending),
        )
        .route("/checkins/{checkinId}/submit", post(checkins::submit))
        .route(
            "/shopping-drafts/{householdId}/generate",
            post(shopping::generate),
        )
        .route(
            "/shopping-drafts/{householdId}/latest",
            get(shopping::latest),
        )
        .route(
            "/shopping-drafts/{draftId}/items",
            patch(shopping::patch_items),
        )
        .route(
            "/shopping-drafts/{draftId}/finalize",
            post(shopping::finalize),
        )
        .route("/pantry-health/{householdId}", get(pantry_health::score))
        .route(
            "/pantry-health/{householdId}/history",
            get(pantry_health::history),
        )
        .route("/health/ready", get(health::ready));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", v1_routes)
        .nest("/internal", internal_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
