//! HTTP auth service client.

use async_trait::async_trait;
use reqwest::Client;

use super::{AuthService, AuthorizationRequest, AuthorizationStatus};
use crate::types::{AuthServiceConfig, Error, Result};

/// Talks to an auth service over HTTP: `POST {base_url}/authorize`.
#[derive(Debug, Clone)]
pub struct HttpAuthService {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAuthService {
    pub fn new(config: &AuthServiceConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(Error::authentication("auth service URL is not configured"));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/authorize", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<AuthorizationStatus> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::authentication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::authentication(format!(
                "Auth service error {}: {}",
                status, body
            )));
        }

        response
            .json::<AuthorizationStatus>()
            .await
            .map_err(|e| Error::authentication(format!("Failed to parse response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_endpoint_joins_base_url() {
        let config = AuthServiceConfig {
            base_url: "http://auth.local/".to_string(),
            api_key: None,
            timeout: Duration::from_secs(1),
        };
        let service = HttpAuthService::new(&config).unwrap();
        assert_eq!(service.endpoint(), "http://auth.local/authorize");
    }

    #[test]
    fn test_missing_url_is_misconfiguration() {
        let err = HttpAuthService::new(&AuthServiceConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_status_wire_format() {
        let granted: AuthorizationStatus =
            serde_json::from_value(json!({"status": "granted"})).unwrap();
        assert_eq!(granted, AuthorizationStatus::Granted);

        let pending: AuthorizationStatus = serde_json::from_value(json!({
            "status": "pending",
            "auth_url": "https://auth.example/x",
            "auth_id": "x"
        }))
        .unwrap();
        assert!(matches!(pending, AuthorizationStatus::Pending { .. }));
    }
}
