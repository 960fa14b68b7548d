use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::AppError;
use crate::state::SharedState;
use crate::submission::{metadata, parser};

pub async fn submit(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    if !parser::is_json(content_type) {
        return Err(AppError::UnsupportedMediaType(
            "Expected application/json".to_string(),
        ));
    }

    let meta = metadata::extract(&headers, Some(addr.ip()), &state.config.trusted_proxies);

    // Detached so that a client hanging up does not cancel calls already dispatched
    let task_state = state.clone();
    let result = tokio::spawn(async move { task_state.orchestrator.handle(&body, meta).await })
        .await
        .map_err(|e| AppError::Internal(format!("Submission task failed: {e}")))??;

    Ok((result.status(), Json(result)).into_response())
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
