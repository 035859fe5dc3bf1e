//! Invocation engine - dispatch and listing over a shared catalog.
//!
//! ```text
//!   CallRequest ──► resolve ──► is_allowed ──► validate ──► inject
//!                                                             │
//!   CallResponse ◄── wrap ◄── execute ◄── auth hook ◄─────────┘
//! ```
//!
//! Listing applies the same `is_allowed` predicate, so everything a caller
//! can list it can also call.

mod dispatcher;
mod listing;

use std::sync::Arc;

use crate::auth::{AuthHook, AuthService, HttpAuthService};
use crate::tools::{AccessPolicy, CallObserver, NoopObserver, ToolCatalog};
use crate::types::{AuthConfig, Result};

/// Dispatcher and listing service. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct ToolEngine {
    catalog: Arc<ToolCatalog>,
    policy: AccessPolicy,
    auth: AuthHook,
    observer: Arc<dyn CallObserver>,
}

impl std::fmt::Debug for ToolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolEngine")
            .field("tools", &self.catalog.len())
            .field("policy", &self.policy)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl ToolEngine {
    /// Engine with authorization disabled, no auth service and no observer.
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self {
            catalog,
            policy: AccessPolicy::default(),
            auth: AuthHook::disabled(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Engine wired from the `auth` config section.
    pub fn from_config(catalog: Arc<ToolCatalog>, config: &AuthConfig) -> Result<Self> {
        let mut engine = Self::new(catalog).with_authorization(config.enabled);
        if let Some(service) = &config.service {
            engine = engine.with_auth_service(Arc::new(HttpAuthService::new(service)?));
        }
        Ok(engine)
    }

    /// Enforce tool permissions against caller scopes.
    pub fn with_authorization(mut self, enabled: bool) -> Self {
        self.policy = AccessPolicy::new(enabled);
        self
    }

    pub fn with_auth_service(mut self, service: Arc<dyn AuthService>) -> Self {
        self.auth = AuthHook::new(service);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }
}
