//! Outbound HTTP client for the Venice API.

use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;

use crate::config::Config;
use crate::error::RelayError;

#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    base_url: url::Url,
    api_key: String,
}

#[derive(Debug)]
pub struct ForwardedResponse {
    pub status: u16,
    pub body: Bytes,
}

impl Forwarder {
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(5))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| RelayError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Resolve a request path against the configured base URL.
    pub fn endpoint(&self, path: &str) -> Result<url::Url, RelayError> {
        self.base_url
            .join(path)
            .map_err(|e| RelayError::Transport(format!("invalid upstream path {path:?}: {e}")))
    }

    fn build(
        &self,
        method: http::Method,
        path: &str,
        body: Option<Bytes>,
        headers: &HeaderMap,
    ) -> Result<reqwest::RequestBuilder, RelayError> {
        let url = self.endpoint(path)?;
        let host = url.host_str().map(str::to_owned);
        let mut builder = self
            .client
            .request(method, url)
            .headers(headers.clone())
            .bearer_auth(&self.api_key);
        if let Some(host) = host {
            builder = builder.header(http::header::HOST, host);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }
        Ok(builder)
    }

    /// Send a request and buffer the full response body.
    pub async fn forward(
        &self,
        method: http::Method,
        path: &str,
        body: Option<Bytes>,
        headers: &HeaderMap,
    ) -> Result<ForwardedResponse, RelayError> {
        let response = self
            .build(method, path, body, headers)?
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        Ok(ForwardedResponse { status, body })
    }

    /// Send a request and hand back the response with its body
    /// unconsumed, for SSE streaming.
    pub async fn forward_stream(
        &self,
        method: http::Method,
        path: &str,
        body: Option<Bytes>,
        headers: &HeaderMap,
    ) -> Result<reqwest::Response, RelayError> {
        self.build(method, path, body, headers)?
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))
    }
}
