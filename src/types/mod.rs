//! Core types for the tool server.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (CallId, TraceId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for server, auth and bridge
//! - **Context**: Per-request caller state (scopes, identity, inbound request)

mod config;
mod context;
mod errors;
mod ids;

pub use config::{
    ApiKeyGrant, AuthConfig, AuthServiceConfig, BridgeConfig, Config, ObservabilityConfig,
    ServerConfig,
};
pub use context::{CallerContext, RequestInfo};
pub use errors::{Error, Result, FORBIDDEN_MESSAGE};
pub use ids::{CallId, TraceId};
