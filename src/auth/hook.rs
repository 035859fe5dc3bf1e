//! Auth hook state machine.

use std::sync::Arc;

use super::{AuthService, AuthorizationRequest, AuthorizationStatus};
use crate::envelope::AuthChallenge;
use crate::tools::ToolDefinition;
use crate::types::{CallerContext, Error, Result};

/// What the dispatcher should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Proceed,
    Challenge(AuthChallenge),
}

/// Runs before every tool body that declares an auth requirement.
#[derive(Clone, Default)]
pub struct AuthHook {
    service: Option<Arc<dyn AuthService>>,
}

impl std::fmt::Debug for AuthHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHook")
            .field("configured", &self.service.is_some())
            .finish()
    }
}

impl AuthHook {
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        Self {
            service: Some(service),
        }
    }

    /// Hook with no service; any tool that needs auth fails.
    pub fn disabled() -> Self {
        Self { service: None }
    }

    /// Decide whether the call may proceed.
    ///
    /// Every failure (no service, no identity, service error, empty
    /// challenge URL) is a fatal `Authentication` error. Never retried.
    pub async fn check(
        &self,
        definition: &ToolDefinition,
        caller: &CallerContext,
    ) -> Result<AuthDecision> {
        let Some(requirement) = &definition.auth else {
            return Ok(AuthDecision::Proceed);
        };

        let service = self.service.as_ref().ok_or_else(|| {
            Error::authentication(format!(
                "tool {} requires provider '{}' but no auth service is configured",
                definition.id,
                requirement.provider()
            ))
        })?;

        let user_id = caller.identity().ok_or_else(|| {
            Error::authentication(format!(
                "tool {} requires an authenticated caller",
                definition.id
            ))
        })?;

        let request = AuthorizationRequest {
            provider: requirement.provider().to_string(),
            scopes: requirement.scopes().to_vec(),
            user_id: user_id.to_string(),
        };

        match service.authorize(&request).await {
            Ok(AuthorizationStatus::Granted) => {
                tracing::debug!(provider = %request.provider, "Auth grant valid");
                Ok(AuthDecision::Proceed)
            }
            Ok(AuthorizationStatus::Pending { auth_url, auth_id }) => {
                if auth_url.is_empty() {
                    return Err(Error::authentication(format!(
                        "auth service returned an empty challenge URL for provider '{}'",
                        request.provider
                    )));
                }
                tracing::info!(provider = %request.provider, auth_id = %auth_id, "Auth grant pending");
                Ok(AuthDecision::Challenge(AuthChallenge { auth_url, auth_id }))
            }
            Err(Error::Authentication(msg)) => Err(Error::Authentication(msg)),
            Err(e) => Err(Error::authentication(format!(
                "auth service failed for provider '{}': {}",
                request.provider, e
            ))),
        }
    }
}
