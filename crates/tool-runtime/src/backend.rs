//! Backend invoker for the Selector HTTP API.
//!
//! Every tool call ends up as exactly one `BackendRequest`: a POST with a
//! JSON body, or a GET whose array response may be filtered client-side.
//! Failures (timeout, connection, non-2xx, undecodable body) are folded into
//! `ToolCallResult::Error` and never propagate past `Backend::invoke`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};

use selector_core::SelectorConfig;

use crate::tool::ToolCallResult;

/// Logical Selector endpoints. Paths come from `SelectorConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Chat,
    Query,
    Phrases,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endpoint::Chat => "chat",
            Endpoint::Query => "query",
            Endpoint::Phrases => "phrases",
        })
    }
}

/// Keep only collection elements whose `field` equals `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Filter a JSON array. Anything other than an array is rejected.
    pub fn apply(&self, body: Value) -> Result<Value, BackendError> {
        match body {
            Value::Array(items) => {
                let kept: Vec<Value> = items
                    .into_iter()
                    .filter(|item| {
                        item.get(&self.field).and_then(Value::as_str) == Some(self.value.as_str())
                    })
                    .collect();
                tracing::info!(
                    count = kept.len(),
                    field = %self.field,
                    value = %self.value,
                    "Filtered collection"
                );
                Ok(Value::Array(kept))
            }
            other => Err(BackendError::UnexpectedShape(format!(
                "expected a JSON array to filter by '{}', got {}",
                self.field,
                crate::schema::json_type_name(&other)
            ))),
        }
    }
}

/// One remote action on behalf of a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    Post { endpoint: Endpoint, body: Value },
    Get { endpoint: Endpoint, filter: Option<FieldFilter> },
}

impl BackendRequest {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            BackendRequest::Post { endpoint, .. } | BackendRequest::Get { endpoint, .. } => {
                *endpoint
            }
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            BackendRequest::Post { .. } => "POST",
            BackendRequest::Get { .. } => "GET",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Invalid API key header: {0}")]
    InvalidHeader(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error: {0}")]
    Status(u16),

    #[error("Invalid JSON response: {0}")]
    Decode(String),

    #[error("Unexpected response: {0}")]
    UnexpectedShape(String),
}

/// Executes backend requests. Implementations must not panic on remote
/// failure; they report it through `ToolCallResult::Error`.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn invoke(&self, request: BackendRequest) -> ToolCallResult;
}

/// `Backend` over the Selector REST API using `reqwest`.
pub struct HttpBackend {
    config: SelectorConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    /// Build the client with bearer auth, JSON headers and the configured timeout.
    pub fn new(config: SelectorConfig) -> Result<Self, BackendError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key()))
            .map_err(|e| BackendError::InvalidHeader(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::ClientBuild(e.to_string()))?;

        tracing::info!(url = %config.base_url, "Selector client initialized");
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    fn url_for(&self, endpoint: Endpoint) -> String {
        let path = match endpoint {
            Endpoint::Chat => &self.config.chat_path,
            Endpoint::Query => &self.config.query_path,
            Endpoint::Phrases => &self.config.phrases_path,
        };
        self.config.endpoint_url(path)
    }

    async fn execute(&self, request: &BackendRequest) -> Result<Value, BackendError> {
        let url = self.url_for(request.endpoint());
        let builder = match request {
            BackendRequest::Post { body, .. } => self.http.post(&url).json(body),
            BackendRequest::Get { .. } => self.http.get(&url),
        };

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.config.timeout)
            } else {
                BackendError::Request(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "API error");
            return Err(BackendError::Status(status.as_u16()));
        }

        let body: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(self.config.timeout)
            } else {
                BackendError::Decode(e.to_string())
            }
        })?;

        match request {
            BackendRequest::Get {
                filter: Some(filter),
                ..
            } => filter.apply(body),
            _ => Ok(body),
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn invoke(&self, request: BackendRequest) -> ToolCallResult {
        let started = Instant::now();
        let endpoint = request.endpoint();
        tracing::info!(method = request.method(), endpoint = %endpoint, "Calling Selector API");

        match self.execute(&request).await {
            Ok(output) => {
                tracing::debug!(
                    endpoint = %endpoint,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Selector API call completed"
                );
                ToolCallResult::completed(output)
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = %endpoint,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Selector API call failed"
                );
                ToolCallResult::error(e.to_string())
            }
        }
    }
}
