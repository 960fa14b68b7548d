use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::state::SharedState;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "content-type";
const MAX_AGE: &str = "86400";

/// Answers every preflight with 204 and stamps CORS headers on all other responses.
pub async fn cors(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let allowed = allowed_origin(&state.config.allowed_origins, origin.as_deref());

    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
        apply(&mut response, allowed.as_deref());
        return response;
    }

    let mut response = next.run(req).await;
    apply(&mut response, allowed.as_deref());
    response
}

/// Origin to echo back. With no allow-list every origin is reflected (`*` when the request
/// carries none); with one, unlisted origins get no allow header at all.
pub fn allowed_origin(allow_list: &[String], origin: Option<&str>) -> Option<String> {
    if allow_list.is_empty() || allow_list.iter().any(|o| o == "*") {
        return Some(origin.unwrap_or("*").to_string());
    }

    origin
        .filter(|o| allow_list.iter().any(|allowed| allowed.eq_ignore_ascii_case(o)))
        .map(|o| o.to_string())
}

fn apply(response: &mut Response, allowed: Option<&str>) {
    let headers = response.headers_mut();
    if let Some(value) = allowed.and_then(|o| HeaderValue::from_str(o).ok()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
}
