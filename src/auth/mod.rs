//! Per-tool auth hand-off.
//!
//! Tools may declare an [`AuthRequirement`](crate::tools::AuthRequirement).
//! Before such a tool runs, the [`AuthHook`] asks an external
//! [`AuthService`] whether the caller already holds the grant. No state is
//! kept between calls; every call asks again.

mod client;
mod hook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Result;

pub use client::HttpAuthService;
pub use hook::{AuthDecision, AuthHook};

/// Question sent to the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub provider: String,
    pub scopes: Vec<String>,
    pub user_id: String,
}

/// Auth service answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The caller holds a valid grant.
    Granted,
    /// The caller must complete the grant at `auth_url` first.
    Pending { auth_url: String, auth_id: String },
}

/// External authorization service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<AuthorizationStatus>;
}
