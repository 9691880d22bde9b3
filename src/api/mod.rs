//! HTTP front door: request dispatch and the two handler families,
//! the translated `/v1/messages` endpoint and generic passthrough.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::{Method, Request, StatusCode};

use crate::state::AppState;

pub mod messages;
pub mod passthrough;

/// Request bodies larger than this are rejected up front.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Route an inbound request. `POST /v1/messages` gets protocol
/// translation, everything else is forwarded to the upstream as-is.
pub async fn dispatch_request(
    state: Arc<AppState>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, DEFAULT_BODY_LIMIT_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return Ok((
                StatusCode::PAYLOAD_TOO_LARGE,
                axum::Json(crate::error::error_payload(
                    "invalid_request_error",
                    "Request body too large",
                )),
            )
                .into_response());
        }
    };

    let response = if parts.method == Method::POST && parts.uri.path() == "/v1/messages" {
        messages::handler(&state, body).await
    } else {
        passthrough::handler(&state, &parts, body).await
    };
    Ok(response)
}
