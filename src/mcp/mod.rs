//! MCP bridge - re-exposes a tool catalog through MCP `tools/list` and
//! `tools/call` over a local byte stream.
//!
//! The bridge never sees the caller's inbound request, so tools that need
//! request injection stay hidden on this path.

mod bridge;
mod client;
pub mod content;
pub mod jsonrpc;
pub mod stdio;

use thiserror::Error;

pub use bridge::{McpTool, ToolBridge};
pub use client::{HttpToolClient, LocalToolClient, RemoteToolClient};
pub use content::{into_content, Content, ImageData};

/// Bridge failures, mapped onto JSON-RPC error codes.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Something the bridged protocol cannot represent. Never recovered.
    #[error("{0}")]
    Unsupported(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The remote catalog rejected or failed the request.
    #[error("remote error: {}", .0.public_message())]
    Remote(#[from] crate::types::Error),
}

impl BridgeError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    pub fn code(&self) -> i32 {
        match self {
            BridgeError::UnknownTool(_) | BridgeError::InvalidParams(_) => jsonrpc::INVALID_PARAMS,
            BridgeError::Unsupported(_) | BridgeError::Remote(_) => jsonrpc::INTERNAL_ERROR,
        }
    }
}
