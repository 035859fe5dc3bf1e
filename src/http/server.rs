//! HTTP server with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::{router, ApiKeyAuthenticator, AppState};
use crate::engine::ToolEngine;
use crate::tools::ToolHealthTracker;
use crate::types::{Config, Error, Result};

/// Call API server.
#[derive(Debug)]
pub struct HttpServer {
    state: AppState,
    addr: SocketAddr,
    cancel: CancellationToken,
}

impl HttpServer {
    pub fn new(state: AppState, addr: SocketAddr) -> Self {
        Self {
            state,
            addr,
            cancel: CancellationToken::new(),
        }
    }

    /// Server wired from config. The engine's observer should be `health`
    /// when one is given so `/health` reflects real calls.
    pub fn from_config(
        engine: ToolEngine,
        health: Option<Arc<ToolHealthTracker>>,
        config: &Config,
    ) -> Result<Self> {
        let addr: SocketAddr = config.server.listen_addr.parse().map_err(|e| {
            Error::validation(format!(
                "invalid listen address '{}': {}",
                config.server.listen_addr, e
            ))
        })?;

        let mut state = AppState::new(engine).with_request_timeout(config.server.request_timeout);
        if config.auth.enabled {
            state = state.with_authenticator(Arc::new(ApiKeyAuthenticator::new(
                config.auth.api_keys.clone(),
            )));
        }
        if let Some(tracker) = health {
            state = state.with_health(tracker);
        }
        Ok(Self::new(state, addr))
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    pub async fn serve(&self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener).await
    }

    /// Run on an already bound listener.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<()> {
        tracing::info!(
            "HTTP server listening on {} (tools={})",
            listener.local_addr()?,
            self.state.engine.catalog().len(),
        );

        let app = router(self.state.clone());
        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.clone().cancelled_owned())
            .await?;

        tracing::info!("HTTP server shut down");
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
