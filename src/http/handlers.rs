//! Route handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;
use crate::envelope::{CallResponse, CallToolFullRequest};
use crate::mcp::jsonrpc::{JsonRpcResponse, PARSE_ERROR};
use crate::mcp::{stdio, BridgeError, LocalToolClient, ToolBridge};
use crate::tools::ToolView;
use crate::types::{CallerContext, Error, RequestInfo};

/// Error response: `{call_id?, success: false, error: {message}}`.
#[derive(Debug)]
pub struct ApiError {
    call_id: Option<String>,
    error: Error,
}

impl ApiError {
    fn for_call(call_id: Option<String>, error: Error) -> Self {
        Self { call_id, error }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self {
            call_id: None,
            error,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self.error, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self.error, status = status.as_u16(), "Request rejected");
        }

        let mut body = json!({
            "success": false,
            "error": {"message": self.error.public_message()},
        });
        if let Some(call_id) = self.call_id {
            body["call_id"] = json!(call_id);
        }
        (status, Json(body)).into_response()
    }
}

/// Authenticate the caller and attach the inbound request.
async fn caller_for(
    state: &AppState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<CallerContext, Error> {
    let caller = match &state.authenticator {
        Some(authenticator) => authenticator.authenticate(headers).await?,
        None => CallerContext::anonymous(),
    };

    let request = RequestInfo {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect(),
        identity: caller.identity().map(str::to_string),
    };
    Ok(caller.with_request(request))
}

/// `GET /`
pub async fn list_tools(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Json<Vec<ToolView>>, ApiError> {
    let caller = caller_for(&state, &method, &uri, &headers).await?;
    Ok(Json(state.engine.list(&caller)))
}

/// `POST /call`
pub async fn call_tool(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Json<CallToolFullRequest>, JsonRejection>,
) -> Result<Json<CallResponse>, ApiError> {
    let caller = caller_for(&state, &method, &uri, &headers).await?;

    let Json(body) = body.map_err(|rejection| Error::validation(rejection.body_text()))?;
    let call_id = body.request.call_id.clone();
    body.check_protocol().map_err(|e| ApiError::for_call(call_id.clone(), e))?;

    let outcome = tokio::time::timeout(
        state.request_timeout,
        state.engine.call(body.request, &caller),
    )
    .await
    .map_err(|_| Error::timeout(format!("Request timed out after {:?}", state.request_timeout)))
    .and_then(|result| result);

    outcome
        .map(Json)
        .map_err(|e| ApiError::for_call(call_id, e))
}

/// `POST /mcp`
///
/// One JSON-RPC message per request, answered by a bridge over the
/// in-process engine. The bridge lists and calls as the authenticated
/// caller, so tools are filtered per caller. Notifications get `202`.
pub async fn mcp(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let caller = caller_for(&state, &method, &uri, &headers).await?;
    let client = LocalToolClient::new(state.engine.clone()).with_caller(caller);
    let bridge = ToolBridge::connect(Arc::new(client), &[])
        .await
        .map_err(|e| match e {
            BridgeError::Remote(e) => e,
            other => Error::internal(other.to_string()),
        })?;

    let reply = match body {
        Ok(Json(message)) => stdio::handle_message(&bridge, message).await,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Unparseable MCP message");
            Some(JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"))
        }
    };

    Ok(match reply {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    })
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Response {
    match &state.health {
        Some(tracker) => Json(tracker.check_system_health()).into_response(),
        None => (StatusCode::OK, Json(json!({"status": "unknown", "tools": []}))).into_response(),
    }
}
