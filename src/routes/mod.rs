pub mod badge;

use axum::routing::post;
use axum::Router;

use crate::state::SharedState;

pub fn badge_routes() -> Router<SharedState> {
    Router::new()
        .route(
            "/badge",
            post(badge::submit).fallback(badge::method_not_allowed),
        )
        .route(
            "/api/badge",
            post(badge::submit).fallback(badge::method_not_allowed),
        )
}
