//! Call envelope - request and response shapes of the call API.
//!
//! Internally a call resolves to a tagged [`CallOutcome`]. On the wire the
//! response keeps the `{call_id, success, value?|error?}` shape; an auth
//! challenge travels as `value: {auth_required: true, auth_url, auth_id}`
//! so existing clients can recognise it and retry after the grant.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::{CallId, Error, Result};

/// Current protocol identifier.
pub const PROTOCOL_SCHEMA: &str = "urn:oxp:1.0";

/// Deprecated alias still accepted for backwards compatibility.
pub const LEGACY_PROTOCOL_SCHEMA: &str = "otc://1.0";

// =============================================================================
// Requests
// =============================================================================

/// Request to call a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Unique identifier of the tool to call.
    pub tool_id: String,
    /// Tool input. Must be a JSON object when present; absent means `{}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl CallRequest {
    pub fn new(tool_id: impl Into<String>, input: Value) -> Self {
        Self {
            tool_id: tool_id.into(),
            input: Some(input),
            call_id: None,
            trace_id: None,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

fn default_protocol_schema() -> String {
    PROTOCOL_SCHEMA.to_string()
}

/// Full body of `POST /call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolFullRequest {
    #[serde(
        rename = "$schema",
        alias = "protocol_schema",
        default = "default_protocol_schema"
    )]
    pub protocol_schema: String,
    pub request: CallRequest,
}

impl CallToolFullRequest {
    pub fn new(request: CallRequest) -> Self {
        Self {
            protocol_schema: default_protocol_schema(),
            request,
        }
    }

    /// Accept exactly the current schema and its deprecated alias.
    pub fn check_protocol(&self) -> Result<()> {
        match self.protocol_schema.as_str() {
            PROTOCOL_SCHEMA => Ok(()),
            LEGACY_PROTOCOL_SCHEMA => {
                tracing::warn!(
                    "Deprecated protocol schema '{}' used; switch to '{}'",
                    LEGACY_PROTOCOL_SCHEMA,
                    PROTOCOL_SCHEMA
                );
                Ok(())
            }
            _ => Err(Error::validation(format!(
                "Invalid protocol schema. Expected '{PROTOCOL_SCHEMA}'."
            ))),
        }
    }
}

// =============================================================================
// Errors and challenges
// =============================================================================

/// Structured error raised by a tool and passed through to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Message for the user or model.
    pub message: String,
    /// Internal message for logging/debugging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer_message: Option<String>,
    #[serde(default)]
    pub can_retry: bool,
    /// Extra content to include in a retry prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_prompt_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            developer_message: None,
            can_retry: false,
            additional_prompt_content: None,
            retry_after_ms: None,
        }
    }

    pub fn with_developer_message(mut self, message: impl Into<String>) -> Self {
        self.developer_message = Some(message.into());
        self
    }

    pub fn with_prompt_content(mut self, content: impl Into<String>) -> Self {
        self.additional_prompt_content = Some(content.into());
        self
    }

    /// Mark the call as retryable, optionally after a backoff.
    pub fn retryable(mut self, retry_after_ms: Option<u64>) -> Self {
        self.can_retry = true;
        self.retry_after_ms = retry_after_ms;
        self
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Challenge returned instead of a result when the caller must first
/// complete an external grant. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChallenge {
    pub auth_url: String,
    pub auth_id: String,
}

// =============================================================================
// Responses
// =============================================================================

/// Result of one call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success(Value),
    AuthRequired(AuthChallenge),
    Error(ToolError),
}

/// Response to a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub struct CallResponse {
    pub call_id: CallId,
    pub outcome: CallOutcome,
}

impl CallResponse {
    pub fn success(call_id: CallId, value: Value) -> Self {
        Self {
            call_id,
            outcome: CallOutcome::Success(value),
        }
    }

    pub fn auth_required(call_id: CallId, challenge: AuthChallenge) -> Self {
        Self {
            call_id,
            outcome: CallOutcome::AuthRequired(challenge),
        }
    }

    pub fn error(call_id: CallId, error: ToolError) -> Self {
        Self {
            call_id,
            outcome: CallOutcome::Error(error),
        }
    }

    /// Wire-level success flag (true for results and challenges).
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, CallOutcome::Error(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.outcome {
            CallOutcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireResponse {
    call_id: String,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ToolError>,
}

impl From<CallResponse> for WireResponse {
    fn from(response: CallResponse) -> Self {
        let call_id = response.call_id.to_string();
        match response.outcome {
            CallOutcome::Success(value) => Self {
                call_id,
                success: true,
                value: Some(value),
                error: None,
            },
            CallOutcome::AuthRequired(challenge) => Self {
                call_id,
                success: true,
                value: Some(serde_json::json!({
                    "auth_required": true,
                    "auth_url": challenge.auth_url,
                    "auth_id": challenge.auth_id,
                })),
                error: None,
            },
            CallOutcome::Error(error) => Self {
                call_id,
                success: false,
                value: None,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<WireResponse> for CallResponse {
    type Error = String;

    fn try_from(wire: WireResponse) -> std::result::Result<Self, Self::Error> {
        let call_id = CallId::from_string(wire.call_id).map_err(str::to_string)?;

        if !wire.success {
            let error = wire
                .error
                .ok_or_else(|| "unsuccessful response without an error".to_string())?;
            return Ok(Self::error(call_id, error));
        }

        let value = wire.value.unwrap_or(Value::Null);
        if let Some(challenge) = as_challenge(&value) {
            return Ok(Self::auth_required(call_id, challenge));
        }
        Ok(Self::success(call_id, value))
    }
}

fn as_challenge(value: &Value) -> Option<AuthChallenge> {
    let map = value.as_object()?;
    if map.get("auth_required").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    Some(AuthChallenge {
        auth_url: map.get("auth_url")?.as_str()?.to_string(),
        auth_id: map
            .get("auth_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn call_id() -> CallId {
        CallId::from_string("c-1".to_string()).unwrap()
    }

    #[test]
    fn test_full_request_defaults_protocol_schema() {
        let body: CallToolFullRequest =
            serde_json::from_value(json!({"request": {"tool_id": "add"}})).unwrap();
        assert_eq!(body.protocol_schema, PROTOCOL_SCHEMA);
        assert!(body.check_protocol().is_ok());
        assert_eq!(body.request.input, None);
    }

    #[test]
    fn test_protocol_schema_alias_and_rejection() {
        let legacy: CallToolFullRequest = serde_json::from_value(json!({
            "$schema": "otc://1.0",
            "request": {"tool_id": "add"}
        }))
        .unwrap();
        assert!(legacy.check_protocol().is_ok());

        let named: CallToolFullRequest = serde_json::from_value(json!({
            "protocol_schema": "urn:other:2.0",
            "request": {"tool_id": "add"}
        }))
        .unwrap();
        let err = named.check_protocol().unwrap_err();
        assert!(err.to_string().contains("Invalid protocol schema"));
    }

    #[test]
    fn test_success_wire_shape() {
        let response = CallResponse::success(call_id(), json!(5));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"call_id": "c-1", "success": true, "value": 5})
        );
    }

    #[test]
    fn test_error_wire_shape() {
        let error = ToolError::new("rate limited")
            .with_developer_message("upstream 429")
            .retryable(Some(1500));
        let response = CallResponse::error(call_id(), error);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "call_id": "c-1",
                "success": false,
                "error": {
                    "message": "rate limited",
                    "developer_message": "upstream 429",
                    "can_retry": true,
                    "retry_after_ms": 1500
                }
            })
        );
    }

    #[test]
    fn test_challenge_survives_the_wire() {
        let challenge = AuthChallenge {
            auth_url: "https://auth.example/grant/1".to_string(),
            auth_id: "grant-1".to_string(),
        };
        let response = CallResponse::auth_required(call_id(), challenge.clone());
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire["success"], true);
        assert_eq!(wire["value"]["auth_required"], true);

        let back: CallResponse = serde_json::from_value(wire).unwrap();
        assert_eq!(back.outcome, CallOutcome::AuthRequired(challenge));
    }

    #[test]
    fn test_plain_object_value_is_not_a_challenge() {
        let wire = json!({"call_id": "c-1", "success": true, "value": {"auth_required": false}});
        let back: CallResponse = serde_json::from_value(wire).unwrap();
        assert!(matches!(back.outcome, CallOutcome::Success(_)));
    }
}
