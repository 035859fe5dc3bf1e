//! Newline-delimited JSON-RPC 2.0 transport.
//!
//! One request per line in, one response per line out. Requests are handled
//! concurrently, so replies may arrive out of order; clients match them by
//! id. Notifications get no reply. Logs go to stderr, never to the protocol
//! stream.

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::bridge::ToolBridge;
use super::jsonrpc::{
    JsonRpcRequest, JsonRpcResponse, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use super::BridgeError;
use crate::types::{Error, Result};

/// Protocol revision answered when the client does not ask for one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

const SERVER_NAME: &str = "toolserver-bridge";

/// Replies buffered ahead of the writer.
const REPLY_BUFFER: usize = 64;

/// Serve MCP until the reader reaches end of stream and every in-flight
/// request has been answered.
pub async fn serve<R, W>(bridge: Arc<ToolBridge>, reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tracing::info!("MCP stdio transport ready");
    let (replies, outbox) = mpsc::channel(REPLY_BUFFER);
    let writer_task = tokio::spawn(write_replies(outbox, writer));

    let mut in_flight = JoinSet::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let bridge = Arc::clone(&bridge);
        let replies = replies.clone();
        in_flight.spawn(async move {
            if let Some(response) = handle_line(&bridge, &line).await {
                if replies.send(response).await.is_err() {
                    tracing::warn!("Reply dropped, writer is gone");
                }
            }
        });

        while let Some(done) = in_flight.try_join_next() {
            log_task_failure(done);
        }
    }

    while let Some(done) = in_flight.join_next().await {
        log_task_failure(done);
    }
    drop(replies);

    writer_task
        .await
        .map_err(|e| Error::internal(format!("MCP writer task failed: {e}")))??;
    tracing::info!("MCP stdio transport closed");
    Ok(())
}

/// Single writer, so frames never interleave.
async fn write_replies<W>(mut outbox: mpsc::Receiver<JsonRpcResponse>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = outbox.recv().await {
        let mut frame = serde_json::to_vec(&response)?;
        frame.push(b'\n');
        writer.write_all(&frame).await?;
        writer.flush().await?;
    }
    Ok(())
}

fn log_task_failure(done: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        tracing::error!(error = %e, "MCP request task aborted");
    }
}

/// Handle one frame. `None` means no reply is due.
pub async fn handle_line(bridge: &ToolBridge, line: &str) -> Option<JsonRpcResponse> {
    match serde_json::from_str(line) {
        Ok(message) => handle_message(bridge, message).await,
        Err(e) => {
            tracing::warn!("Invalid JSON-RPC message: {}", e);
            Some(JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"))
        }
    }
}

/// Handle one already parsed message.
pub async fn handle_message(bridge: &ToolBridge, message: Value) -> Option<JsonRpcResponse> {
    let id = message.get("id").cloned();
    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Malformed JSON-RPC request: {}", e);
            return Some(JsonRpcResponse::error(id, INVALID_REQUEST, "Invalid Request"));
        }
    };

    if request.is_notification() {
        tracing::debug!(method = %request.method, "Notification");
        return None;
    }

    Some(handle_request(bridge, request).await)
}

async fn handle_request(bridge: &ToolBridge, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id;
    let params = request.params.unwrap_or(Value::Null);

    match request.method.as_str() {
        "initialize" => {
            let version = params
                .get("protocolVersion")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_PROTOCOL_VERSION);
            JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": version,
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
                }),
            )
        }
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({"tools": bridge.list_tools()})),
        "tools/call" => match call_tool(bridge, &params).await {
            Ok(content) => {
                JsonRpcResponse::success(id, json!({"content": content, "isError": false}))
            }
            Err(e) => {
                tracing::warn!(error = %e, "tools/call failed");
                JsonRpcResponse::error(id, e.code(), e.to_string())
            }
        },
        other => {
            tracing::debug!(method = %other, "Unknown method");
            JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
        }
    }
}

async fn call_tool(
    bridge: &ToolBridge,
    params: &Value,
) -> std::result::Result<Vec<super::Content>, BridgeError> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| BridgeError::InvalidParams("missing tool name".to_string()))?;
    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(BridgeError::InvalidParams("arguments must be an object".to_string()))
        }
    };
    bridge.call_tool(name, arguments).await
}
