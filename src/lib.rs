//! # Toolserver Core - Tool Catalog, Call API and MCP Bridge
//!
//! A tool-serving runtime providing:
//! - A versioned, schema-described tool catalog
//! - An invocation engine: permission filtering, JSON Schema validation,
//!   per-tool auth hand-off, structured success/error envelopes
//! - An HTTP call API (`GET /`, `POST /call`)
//! - An MCP bridge that re-exposes a catalog over stdio
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────────────────────────┐
//!   HTTP caller →  │  http ─► engine ─► catalog ─► Tool   │
//!                  │            │                          │
//!                  │            └─► auth hook ─► AuthService
//!                  └──────────────────────────────────────┘
//!   MCP client  →  mcp::stdio ─► ToolBridge ─► RemoteToolClient ─► call API
//! ```

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod auth;
pub mod engine;
pub mod envelope;
pub mod http;
pub mod mcp;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;
pub mod validation;

pub use engine::ToolEngine;
pub use envelope::{CallOutcome, CallRequest, CallResponse, ToolError};
pub use tools::{FnTool, Tool, ToolCatalog};
pub use types::{CallerContext, Config, Error, Result};
