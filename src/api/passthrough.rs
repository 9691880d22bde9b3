//! Generic passthrough for non-translated endpoints. Request and
//! response bodies are forwarded verbatim, only the path may be
//! rewritten to line up with the upstream layout.

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::request::Parts;
use http::StatusCode;

use crate::error::RelayError;
use crate::state::AppState;

/// Inbound paths rewritten before forwarding.
const PATH_REWRITES: &[(&str, &str)] = &[("/v1/models", "/models")];

pub async fn handler(state: &AppState, parts: &Parts, body: Bytes) -> Response {
    match handler_inner(state, parts, body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(path = %parts.uri.path(), error = %err, "passthrough failed");
            (
                StatusCode::BAD_GATEWAY,
                axum::Json(serde_json::json!({ "error": format!("Proxy error: {err}") })),
            )
                .into_response()
        }
    }
}

async fn handler_inner(
    state: &AppState,
    parts: &Parts,
    body: Bytes,
) -> Result<Response, RelayError> {
    let path = rewrite_path(parts.uri.path());
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut headers = http::HeaderMap::new();
    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .cloned()
        .unwrap_or(http::HeaderValue::from_static("application/json"));
    headers.insert(http::header::CONTENT_TYPE, content_type);

    let body = if body.is_empty() { None } else { Some(body) };
    let forwarded = state
        .forwarder
        .forward(parts.method.clone(), &path_and_query, body, &headers)
        .await?;

    tracing::debug!(
        path = %path_and_query,
        status = forwarded.status,
        "passthrough forwarded"
    );

    let mut response = Response::new(Body::from(forwarded.body));
    *response.status_mut() = StatusCode::from_u16(forwarded.status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

fn rewrite_path(path: &str) -> &str {
    for (from, to) in PATH_REWRITES {
        if path == *from {
            return to;
        }
    }
    path
}
