//! Call API transport.
//!
//! - `GET /` lists the tools the caller may call
//! - `POST /call` invokes one tool
//! - `POST /mcp` speaks MCP as the authenticated caller
//! - `GET /health` reports execution health

mod auth;
mod handlers;
mod server;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::engine::ToolEngine;
use crate::tools::ToolHealthTracker;

pub use auth::{ApiKeyAuthenticator, Authenticator, API_KEY_HEADER};
pub use handlers::ApiError;
pub use server::HttpServer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub engine: ToolEngine,
    /// `None` means every caller is anonymous.
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub health: Option<Arc<ToolHealthTracker>>,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("authenticated", &self.authenticator.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(engine: ToolEngine) -> Self {
        Self {
            engine,
            authenticator: None,
            health: None,
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_health(mut self, tracker: Arc<ToolHealthTracker>) -> Self {
        self.health = Some(tracker);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Build the call API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list_tools))
        .route("/call", post(handlers::call_tool))
        .route("/mcp", post(handlers::mcp))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
