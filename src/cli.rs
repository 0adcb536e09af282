use std::sync::Arc;

use anyhow::Result;
use home_inventory_core::HomeInventoryCore;
use home_inventory_ledger::{AddManualItemsRequest, Ledger};
use home_inventory_planner::{
    ExternalPlanner, HeuristicPlanner, HttpLlmClient, Planner, RecommendationEngine,
};
use home_inventory_queue::JobQueue;
use home_inventory_shared::{
    Clock, IdProvider, ItemCategory, ReceiptItemInput, SystemClock, Unit, UuidIds,
};
use home_inventory_shopping::ShoppingStore;
use home_inventory_worker::{HeuristicExtractor, WorkerPool};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

const DEFAULT_MAX_SUBMIT_ATTEMPTS: u32 = 3;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Builds the one `HomeInventoryCore` shared by every command. Each
/// invocation gets its own fresh in-memory state; there is no
/// persistence layer to reattach to.
fn build_core(config: &Config) -> Arc<HomeInventoryCore> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdProvider> = Arc::new(UuidIds);

    let queue = Arc::new(JobQueue::new(
        config.upload_origin.clone(),
        DEFAULT_MAX_SUBMIT_ATTEMPTS,
        clock.clone(),
        ids.clone(),
    ));
    let ledger = Arc::new(Ledger::new(clock.clone(), ids.clone()));
    let planner = build_planner(config, ids.clone());
    let recommendations = Arc::new(RecommendationEngine::new(planner, clock.clone(), ids.clone()));
    let shopping = Arc::new(ShoppingStore::new(clock.clone(), ids.clone()));

    Arc::new(HomeInventoryCore::new(
        queue,
        ledger,
        recommendations,
        shopping,
        clock,
        ids,
    ))
}

/// Picks the meal/purchase planner from `HOME_INVENTORY_LLM_PROVIDER`.
/// Any missing API key or unrecognized provider falls back to the
/// always-available heuristic planner.
fn build_planner(config: &Config, ids: Arc<dyn IdProvider>) -> Box<dyn Planner> {
    let model = config.planner_model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());

    match config.llm_provider.as_deref() {
        Some("openai") => match &config.openai_api_key {
            Some(key) => {
                let base_url = config.llm_base_url.clone().unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
                let client = HttpLlmClient::new(base_url, model.clone(), key.clone());
                Box::new(ExternalPlanner::new(client, ids, model, home_inventory_planner::DEFAULT_PLANNER_DEADLINE))
            }
            None => {
                tracing::warn!("llm_provider=openai but OPENAI_API_KEY is unset; using heuristic planner");
                Box::new(HeuristicPlanner::new(ids))
            }
        },
        Some("openrouter") => match &config.openrouter_api_key {
            Some(key) => {
                let base_url = config.llm_base_url.clone().unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string());
                let mut client = HttpLlmClient::new(base_url, model.clone(), key.clone());
                if let Some(site) = &config.openrouter_site_url {
                    client = client.with_header("HTTP-Referer", site.clone());
                }
                if let Some(app) = &config.openrouter_app_name {
                    client = client.with_header("X-Title", app.clone());
                }
                Box::new(ExternalPlanner::new(client, ids, model, home_inventory_planner::DEFAULT_PLANNER_DEADLINE))
            }
            None => {
                tracing::warn!("llm_provider=openrouter but OPENROUTER_API_KEY is unset; using heuristic planner");
                Box::new(HeuristicPlanner::new(ids))
            }
        },
        Some("gemini") => match (&config.gemini_api_key, &config.llm_base_url) {
            (Some(key), Some(base_url)) => {
                let client = HttpLlmClient::new(base_url.clone(), model.clone(), key.clone());
                Box::new(ExternalPlanner::new(client, ids, model, home_inventory_planner::DEFAULT_PLANNER_DEADLINE))
            }
            _ => {
                tracing::warn!(
                    "llm_provider=gemini requires both GEMINI_API_KEY and an OpenAI-compatible llm_base_url; using heuristic planner"
                );
                Box::new(HeuristicPlanner::new(ids))
            }
        },
        Some(other) => {
            tracing::warn!(provider = other, "unrecognized llm provider; using heuristic planner");
            Box::new(HeuristicPlanner::new(ids))
        }
        None => Box::new(HeuristicPlanner::new(ids)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// `serve` runs the JSON API and, in the same process, the worker
/// pool that drains its job queue. There is no separate worker process
/// mode for the API to talk to, so the two run together.
pub async fn serve(config: Config, port_override: Option<u16>) -> Result<()> {
    let core = build_core(&config);

    let worker_cancel = CancellationToken::new();
    core.set_worker_cancellation(worker_cancel.clone()).await;
    let pool = WorkerPool::new(core.clone(), HeuristicExtractor, Some(config.worker_poll_interval_ms));
    let pool_cancel = worker_cancel.clone();
    let pool_handle = tokio::spawn(async move { pool.run(pool_cancel).await });

    let state = AppState::new(core.clone(), config.worker_token.clone());
    let app = crate::routes::build_router(state);

    let port = port_override.unwrap_or(config.api_port);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "home-inventory API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("stopping worker pool");
    core.shutdown().await;
    let _ = pool_handle.await;

    info!("shutdown complete");
    Ok(())
}

/// `worker` runs a worker pool in-process against a freshly built core,
/// useful for exercising the extraction/backoff/dead-letter path without
/// the HTTP surface attached.
pub async fn worker(config: Config) -> Result<()> {
    let core = build_core(&config);
    let cancel = CancellationToken::new();
    core.set_worker_cancellation(cancel.clone()).await;

    let pool = WorkerPool::new(core.clone(), HeuristicExtractor, Some(config.worker_poll_interval_ms));
    let run = tokio::spawn({
        let cancel = cancel.clone();
        async move { pool.run(cancel).await }
    });

    shutdown_signal().await;
    core.shutdown().await;
    let _ = run.await;
    Ok(())
}

/// `seed-demo` loads a small fixture household so the API has
/// something to show immediately after boot, then prints a summary.
pub async fn seed_demo(config: Config) -> Result<()> {
    let core = build_core(&config);
    let household_id = "demo_household";

    let items = vec![
        ReceiptItemInput {
            item_key: "whole_milk".to_string(),
            raw_name: "Whole Milk 1L".to_string(),
            normalized_name: "whole milk".to_string(),
            quantity: 2.0,
            unit: Unit::L,
            category: ItemCategory::Dairy,
            unit_price: Some(1.49),
        },
        ReceiptItemInput {
            item_key: "chicken_breast".to_string(),
            raw_name: "Chicken Breast".to_string(),
            normalized_name: "chicken breast".to_string(),
            quantity: 1.2,
            unit: Unit::Kg,
            category: ItemCategory::Protein,
            unit_price: Some(6.2),
        },
        ReceiptItemInput {
            item_key: "rice".to_string(),
            raw_name: "Jasmine Rice 2kg".to_string(),
            normalized_name: "jasmine rice".to_string(),
            quantity: 2.0,
            unit: Unit::Kg,
            category: ItemCategory::Grain,
            unit_price: Some(0.9),
        },
    ];

    let outcome = core
        .ledger()
        .add_manual_items(
            household_id,
            AddManualItemsRequest {
                items,
                purchased_at: None,
                notes: Some("seed-demo fixture".to_string()),
                idempotency_key: None,
            },
        )
        .await?;

    let lots = core.inventory_snapshot(household_id).await;
    info!(household_id, lots = lots.len(), new_lots = outcome.lot_ids.len(), "seeded demo household");

    let daily = core
        .generate_daily(household_id, home_inventory_core::GenerateDailyRequest::default())
        .await;
    info!(recommendations = daily.items.len(), "generated a daily recommendation run for the demo household");

    let health = core
        .pantry_health(household_id, home_inventory_core::PantryHealthRequest::default())
        .await;
    info!(score = health.score, "computed pantry health for the demo household");

    Ok(())
}
