pub mod config;
pub mod error;
pub mod state;
pub mod kv;
pub mod models;
pub mod middleware;
pub mod routes;
pub mod actions;
pub mod submission;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, KvBackend};
use crate::kv::{KvStore, MemoryKv};
use crate::state::{AppState, SharedState};
use crate::submission::Orchestrator;

/// Build shared state with the collaborators named in `config`.
pub fn build_state(config: Config) -> SharedState {
    let memory_kv = match config.kv {
        KvBackend::Memory => {
            tracing::info!("Using in-memory key-value store");
            Some(Arc::new(MemoryKv::new()))
        }
        KvBackend::Off => {
            tracing::info!("Key-value store disabled; rate limiting and persistence are skipped");
            None
        }
    };

    let store = memory_kv.clone().map(|kv| kv as Arc<dyn KvStore>);
    let orchestrator = Orchestrator::from_config(&config, store);

    Arc::new(AppState {
        config,
        orchestrator,
        memory_kv,
    })
}

pub fn build_app(config: Config) -> (Router, SharedState) {
    let state = build_state(config);
    (build_router(state.clone()), state)
}

pub fn build_router(state: SharedState) -> Router {
    let router = Router::new()
        .merge(routes::badge_routes())
        .route("/health", axum::routing::get(health))
        .route("/api/health", axum::routing::get(health));

    let router = match &state.config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found),
    };

    // CORS sits outside the body limit so its 413 still carries the CORS headers
    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(state.config.max_body_size)),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::cors::cors,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

/// Periodically drop expired keys from the in-memory store.
pub async fn sweep_expired(kv: Arc<MemoryKv>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let removed = kv.purge_expired();
        if removed > 0 {
            tracing::debug!("Purged {removed} expired keys");
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}
