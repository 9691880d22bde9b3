//! `/v1/messages` endpoint: full protocol translation in both
//! directions, buffered or streaming depending on the request.

use std::collections::VecDeque;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::StreamExt;
use http::{HeaderMap, StatusCode};

use crate::error::{upstream_error, RelayError};
use crate::protocol::openai::ChatResponse;
use crate::state::AppState;
use crate::translate::request::translate_request;
use crate::translate::response::{translate_response, unix_millis};
use crate::translate::stream::{encode_event_frame, StreamTranslator};

pub async fn handler(state: &AppState, body: Bytes) -> Response {
    match handler_inner(state, body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "messages request failed");
            err.into_response()
        }
    }
}

async fn handler_inner(state: &AppState, body: Bytes) -> Result<Response, RelayError> {
    let request: crate::protocol::anthropic::MessagesRequest = serde_json::from_slice(&body)
        .map_err(|e| RelayError::Translation(format!("failed to parse request body: {e}")))?;

    let chat_request = translate_request(&request);
    let upstream_body = serde_json::to_vec(&chat_request)
        .map_err(|e| RelayError::Translation(format!("failed to encode upstream request: {e}")))?;

    tracing::debug!(
        model = %request.model,
        stream = chat_request.stream,
        messages = chat_request.messages.len(),
        "translating messages request"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );

    let message_id = new_message_id();
    if chat_request.stream {
        Ok(stream_response(state, upstream_body, headers, request.model, message_id).await)
    } else {
        buffered_response(state, upstream_body, headers, &request.model, &message_id).await
    }
}

async fn buffered_response(
    state: &AppState,
    upstream_body: Vec<u8>,
    headers: HeaderMap,
    model: &str,
    message_id: &str,
) -> Result<Response, RelayError> {
    let forwarded = state
        .forwarder
        .forward(
            http::Method::POST,
            "/chat/completions",
            Some(Bytes::from(upstream_body)),
            &headers,
        )
        .await?;

    if forwarded.status >= 300 {
        return Err(upstream_error(forwarded.status, &forwarded.body));
    }

    let chat_response: ChatResponse = serde_json::from_slice(&forwarded.body)
        .map_err(|e| RelayError::Translation(format!("failed to parse upstream response: {e}")))?;
    let mut response = translate_response(&chat_response, model);
    response.id = message_id.to_string();
    Ok((StatusCode::OK, axum::Json(response)).into_response())
}

async fn stream_response(
    state: &AppState,
    upstream_body: Vec<u8>,
    headers: HeaderMap,
    model: String,
    message_id: String,
) -> Response {
    let upstream = state
        .forwarder
        .forward_stream(
            http::Method::POST,
            "/chat/completions",
            Some(Bytes::from(upstream_body)),
            &headers,
        )
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(err) => return error_event_response(err.error_type(), &err.to_string()),
    };

    let status = upstream.status().as_u16();
    if status >= 300 {
        let body = upstream.bytes().await.unwrap_or_default();
        let err = upstream_error(status, &body);
        return error_event_response(err.error_type(), &err.to_string());
    }

    struct StreamState {
        upstream: std::pin::Pin<
            Box<dyn futures_util::Stream<Item = Result<Bytes, reqwest::Error>> + Send>,
        >,
        translator: StreamTranslator,
        pending: VecDeque<Bytes>,
        done: bool,
    }

    let initial = StreamState {
        upstream: Box::pin(upstream.bytes_stream()),
        translator: StreamTranslator::new(model, message_id),
        pending: VecDeque::new(),
        done: false,
    };

    let output = futures_util::stream::unfold(initial, |mut st| async move {
        loop {
            if let Some(frame) = st.pending.pop_front() {
                return Some((frame, st));
            }
            if st.done {
                return None;
            }
            let mut frames = Vec::new();
            match st.upstream.next().await {
                Some(Ok(chunk)) => st.translator.feed(&chunk, &mut frames),
                Some(Err(e)) => {
                    st.translator.fail(
                        "api_error",
                        &format!("Upstream stream error: {e}"),
                        &mut frames,
                    );
                    st.done = true;
                }
                None => {
                    if !st.translator.ended() {
                        st.translator.fail(
                            "api_error",
                            "Upstream stream ended before completion",
                            &mut frames,
                        );
                    }
                    st.done = true;
                }
            }
            st.pending.extend(frames);
        }
    });

    sse_response(Body::from_stream(
        output.map(Ok::<Bytes, std::convert::Infallible>),
    ))
}

/// SSE response carrying a single error event. Used when the failure
/// happens before any upstream bytes arrive on a streaming request,
/// so the client still gets a well-formed event stream.
fn error_event_response(error_type: &str, message: &str) -> Response {
    let frame = encode_event_frame(&crate::protocol::anthropic::StreamEvent::Error {
        error: crate::protocol::anthropic::ErrorBody {
            type_: error_type.to_string(),
            message: message.to_string(),
        },
    });
    sse_response(Body::from(frame))
}

fn sse_response(body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        http::header::CACHE_CONTROL,
        http::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        http::header::CONNECTION,
        http::HeaderValue::from_static("keep-alive"),
    );
    response
}

fn new_message_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("msg_{}_{}", unix_millis(), &suffix[..6])
}
