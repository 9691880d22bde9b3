use axum::response::IntoResponse;
use http::StatusCode;

/// Canonical error type used across all modules.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Proxy translation error: {0}")]
    Translation(String),
}

/// Map an upstream HTTP status code to the Anthropic-style error type tag.
#[must_use]
pub fn error_type_for_status(status: u16) -> &'static str {
    match status {
        400 => "invalid_request_error",
        401 => "authentication_error",
        404 => "not_found_error",
        429 => "rate_limit_error",
        _ => "api_error",
    }
}

/// Map an upstream HTTP status code to the status returned to the client.
/// 4xx codes the client understands pass through; 5xx collapses to 500.
#[must_use]
pub fn client_status_for_upstream(status: u16) -> StatusCode {
    let mapped = if status >= 500 { 500 } else { status };
    StatusCode::from_u16(mapped).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Build a [`RelayError::Upstream`] from a non-success upstream response,
/// extracting `error.message` from the body when it parses as JSON.
#[must_use]
pub fn upstream_error(status: u16, body: &[u8]) -> RelayError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| format!("Venice API error (HTTP {status})"));
    RelayError::Upstream { status, message }
}

impl RelayError {
    /// HTTP status reported to the client.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Upstream { status, .. } => client_status_for_upstream(*status),
            RelayError::Transport(_) | RelayError::Translation(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Anthropic-style error type tag.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            RelayError::Upstream { status, .. } => error_type_for_status(*status),
            RelayError::Transport(_) | RelayError::Translation(_) => "api_error",
        }
    }

    /// JSON body in the Anthropic error envelope.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        error_payload(self.error_type(), &self.to_string())
    }
}

/// Build the Anthropic error envelope.
#[must_use]
pub fn error_payload(error_type: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "error",
        "error": {
            "type": error_type,
            "message": message,
        }
    })
}

impl IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), axum::Json(self.payload())).into_response()
    }
}
