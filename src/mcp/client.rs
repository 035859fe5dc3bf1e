//! Remote catalog clients used by the bridge.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::engine::ToolEngine;
use crate::envelope::{CallRequest, CallResponse, CallToolFullRequest};
use crate::tools::ToolView;
use crate::types::{BridgeConfig, CallerContext, Error, Result};

/// Anything that can list and call tools.
#[async_trait]
pub trait RemoteToolClient: Send + Sync {
    async fn list(&self) -> Result<Vec<ToolView>>;

    async fn call(&self, request: CallRequest) -> Result<CallResponse>;
}

// =============================================================================
// HTTP
// =============================================================================

/// Speaks the call API (`GET /`, `POST /call`) of a remote tool server.
#[derive(Debug, Clone)]
pub struct HttpToolClient {
    client: Client,
    base_url: String,
}

impl HttpToolClient {
    pub fn new(
        base_url: impl Into<String>,
        headers: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::validation(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::validation(format!("invalid value for header {name}: {e}")))?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        Self::new(&config.remote_url, &config.headers, config.timeout)
    }

    async fn read_error(response: reqwest::Response) -> Error {
        let status = response.status();
        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| {
                body.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("remote returned {status}"));

        match status {
            StatusCode::BAD_REQUEST => Error::validation(message),
            StatusCode::FORBIDDEN => Error::Forbidden,
            StatusCode::NOT_FOUND => Error::not_found(message),
            StatusCode::UNAUTHORIZED => Error::unauthenticated(message),
            StatusCode::REQUEST_TIMEOUT => Error::timeout(message),
            StatusCode::BAD_GATEWAY => Error::authentication(message),
            _ => Error::internal(message),
        }
    }
}

#[async_trait]
impl RemoteToolClient for HttpToolClient {
    async fn list(&self) -> Result<Vec<ToolView>> {
        let response = self.client.get(format!("{}/", self.base_url)).send().await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json().await?)
    }

    async fn call(&self, request: CallRequest) -> Result<CallResponse> {
        let body = CallToolFullRequest::new(request);
        let response = self
            .client
            .post(format!("{}/call", self.base_url))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }
        Ok(response.json().await?)
    }
}

// =============================================================================
// In-process
// =============================================================================

/// Wraps an in-process engine. Calls run as the attached caller, anonymous
/// unless [`with_caller`](Self::with_caller) says otherwise.
#[derive(Debug, Clone)]
pub struct LocalToolClient {
    engine: ToolEngine,
    caller: CallerContext,
}

impl LocalToolClient {
    pub fn new(engine: ToolEngine) -> Self {
        Self {
            engine,
            caller: CallerContext::anonymous(),
        }
    }

    /// List and call as `caller`, so tools are filtered per caller.
    pub fn with_caller(mut self, caller: CallerContext) -> Self {
        self.caller = caller;
        self
    }
}

#[async_trait]
impl RemoteToolClient for LocalToolClient {
    async fn list(&self) -> Result<Vec<ToolView>> {
        Ok(self.engine.list(&self.caller))
    }

    async fn call(&self, request: CallRequest) -> Result<CallResponse> {
        self.engine.call(request, &self.caller).await
    }
}
