//! Axum application: webhook ingress, a worker pool consuming its own
//! scheduled jobs, and a couple of read-only operator endpoints.

pub mod core;
pub mod error_handler;
pub mod middleware_layer;
pub mod routes;
pub mod webhook_signature;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use hosting_client::{HostingClient, HostingClientConfig, TokenCache};
use review_engine::{Config, EventDispatcher, InMemoryStore, ReviewEngine, ReviewJobHandler, Scheduler};
use tokio::sync::watch;
use tracing::info;

use crate::core::app_state::AppState;
use crate::error_handler::{AppError, AppResult};

const WORKER_POOL_SIZE: usize = 8;

fn build_state(config: Config) -> AppResult<AppState> {
    let config = Arc::new(config);

    let hosting_cfg = HostingClientConfig {
        base_url: config.github_api_base_url.clone(),
        app_id: config.app_id.clone(),
        private_key_pem: Arc::new(config.app_private_key_pem.clone()),
    };
    let hosting = Arc::new(
        HostingClient::new(hosting_cfg, Arc::new(TokenCache::new()))
            .map_err(|err| AppError::BadRequest(err.to_string()))?,
    );

    let ai = Arc::new(
        ai_reviewer::AiReviewer::new(ai_reviewer::AiReviewerConfig {
            base_url: config.ai_endpoint_base_url.clone(),
            api_key: config.ai_api_key.clone(),
            timeout_secs: 120,
        })
        .map_err(|err| AppError::BadRequest(err.to_string()))?,
    );

    let store = Arc::new(InMemoryStore::new());
    let engine = Arc::new(ReviewEngine::new(
        Arc::clone(&store),
        Arc::clone(&hosting),
        Arc::clone(&ai),
        Arc::clone(&config),
    ));
    let handler = Arc::new(ReviewJobHandler::new(engine, Arc::clone(&hosting), Arc::clone(&config)));
    let scheduler = Arc::new(Scheduler::new(handler, WORKER_POOL_SIZE));
    let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&store), Arc::clone(&scheduler), Arc::clone(&config)));

    Ok(AppState { store, scheduler, dispatcher, config })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/webhooks/host", post(routes::webhooks::github_webhook))
        .route("/admin/installations/{id}", get(routes::admin::get_installation))
        .route("/admin/usage/{installation_id}/{year}/{month}", get(routes::admin::get_usage))
        .layer(axum::middleware::from_fn(middleware_layer::json_extractor::json_error_mapper))
        .with_state(state)
}

/// Builds the app, starts the scheduler's worker loop, and serves until the
/// process receives a shutdown signal.
pub async fn run(config: Config) -> AppResult<()> {
    let host = config.host.clone();
    let port = config.port;

    let state = build_state(config)?;
    let scheduler = Arc::clone(&state.scheduler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let app = build_router(state);
    let addr = format!("{host}:{port}");
    info!(addr, "starting server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(AppError::Bind)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .map_err(AppError::Bind)?;

    let _ = shutdown_tx.send(true);
    let _ = scheduler_task.await;
    Ok(())
}
