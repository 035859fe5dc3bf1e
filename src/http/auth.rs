//! Caller authentication for the call API.

use async_trait::async_trait;
use axum::http::HeaderMap;
use std::collections::HashMap;

use crate::types::{ApiKeyGrant, CallerContext, Error, Result};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Maps inbound request headers to an authenticated caller.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerContext>;
}

/// Static API keys from configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, ApiKeyGrant>,
}

impl ApiKeyAuthenticator {
    pub fn new(keys: HashMap<String, ApiKeyGrant>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<CallerContext> {
        let key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::unauthenticated("Missing API key"))?;

        let grant = self
            .keys
            .get(key)
            .ok_or_else(|| Error::unauthenticated("Invalid API key"))?;

        Ok(CallerContext::authenticated(
            grant.identity.clone(),
            grant.scopes.iter().cloned(),
        ))
    }
}
