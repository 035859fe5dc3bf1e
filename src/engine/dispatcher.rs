//! Invocation dispatcher.

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::Instrument;

use super::ToolEngine;
use crate::auth::AuthDecision;
use crate::envelope::{CallRequest, CallResponse, ToolError};
use crate::tools::{
    CallClass, CallRecord, CapabilityType, Injected, RegisteredTool, ToolArguments, ToolFailure,
};
use crate::types::{CallId, CallerContext, Error, Result, TraceId};

impl ToolEngine {
    /// Execute one call.
    ///
    /// Resolution and permission failures, invalid payloads, auth-service
    /// failures and undeclared tool failures come back as `Err`. Results,
    /// auth challenges and declared tool errors come back as `Ok`.
    pub async fn call(&self, request: CallRequest, caller: &CallerContext) -> Result<CallResponse> {
        let call_id = CallId::resolve(request.call_id.clone());
        let span = tracing::info_span!(
            "tool_call",
            tool_id = %request.tool_id,
            call_id = %call_id,
            trace_id = tracing::field::Empty,
        );
        if let Some(trace_id) = request
            .trace_id
            .clone()
            .and_then(|t| TraceId::from_string(t).ok())
        {
            span.record("trace_id", trace_id.as_str());
        }

        self.dispatch(request, call_id, caller)
            .instrument(span)
            .await
    }

    async fn dispatch(
        &self,
        request: CallRequest,
        call_id: CallId,
        caller: &CallerContext,
    ) -> Result<CallResponse> {
        let entry = self.resolve(&request.tool_id)?;
        let definition = &entry.definition;

        if !self.policy.is_allowed(definition, caller) {
            tracing::debug!("Caller not allowed");
            return Err(Error::Forbidden);
        }

        let payload = match request.input {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value,
        };
        entry.validator.validate(&definition.id, &payload)?;
        let Value::Object(input) = payload else {
            return Err(Error::validation(format!(
                "Invalid payload for tool call to tool {}",
                definition.id
            )));
        };

        let args = self.inject(entry, input, caller)?;

        if let AuthDecision::Challenge(challenge) = self.auth.check(definition, caller).await? {
            return Ok(CallResponse::auth_required(call_id, challenge));
        }

        self.execute(entry, args, call_id).await
    }

    /// Look up a tool. Unknown ids are indistinguishable from forbidden ones
    /// while authorization is enabled.
    fn resolve(&self, tool_id: &str) -> Result<&RegisteredTool> {
        match self.catalog.get(tool_id) {
            Some(entry) => Ok(entry),
            None if self.policy.auth_enabled() => {
                tracing::debug!("Unknown tool");
                Err(Error::Forbidden)
            }
            None => Err(Error::not_found(format!("Tool {} not found", tool_id))),
        }
    }

    fn inject(
        &self,
        entry: &RegisteredTool,
        input: Map<String, Value>,
        caller: &CallerContext,
    ) -> Result<ToolArguments> {
        let mut args = ToolArguments::new(input);
        for param in &entry.definition.injected {
            match param.capability {
                CapabilityType::CallerRequest => {
                    let request = caller.request().ok_or(Error::Forbidden)?;
                    args.injected
                        .insert(param.name.clone(), Injected::CallerRequest(Arc::clone(request)));
                }
            }
        }
        Ok(args)
    }

    async fn execute(
        &self,
        entry: &RegisteredTool,
        args: ToolArguments,
        call_id: CallId,
    ) -> Result<CallResponse> {
        let handler = Arc::clone(&entry.handler);
        let observer = Arc::clone(&self.observer);
        let tool_id = entry.definition.id.clone();

        // Detached: the record is made even if the caller stops waiting.
        let supervisor = tokio::spawn(
            async move {
                let started = Instant::now();
                // A panicking tool body must not take the supervisor with it.
                let joined =
                    tokio::spawn(async move { handler.invoke(args).await }.in_current_span()).await;
                let executed = Executed::from_join(joined);

                let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                observer.record(&CallRecord {
                    tool_id,
                    outcome: executed.class(),
                    latency_ms,
                    finished_at: chrono::Utc::now(),
                });
                executed
            }
            .instrument(tracing::Span::current()),
        );

        match supervisor.await {
            Ok(Executed::Value(value)) => Ok(CallResponse::success(call_id, value)),
            Ok(Executed::Declared(error)) => Ok(CallResponse::error(call_id, error)),
            Ok(Executed::Failed) => Err(internal_failure(&entry.definition.id)),
            Err(join_error) => {
                tracing::error!(error = %join_error, "Tool supervisor aborted");
                Err(internal_failure(&entry.definition.id))
            }
        }
    }
}

/// Result of running a tool body, already logged.
enum Executed {
    Value(Value),
    Declared(ToolError),
    Failed,
}

impl Executed {
    fn from_join(
        joined: std::result::Result<std::result::Result<Value, ToolFailure>, JoinError>,
    ) -> Self {
        match joined {
            Ok(Ok(value)) => {
                tracing::debug!("Tool call completed");
                Executed::Value(value)
            }
            Ok(Err(ToolFailure::Declared(error))) => {
                tracing::info!(
                    error = %error,
                    developer_message = ?error.developer_message,
                    "Tool returned an error"
                );
                Executed::Declared(error)
            }
            Ok(Err(ToolFailure::Other(detail))) => {
                tracing::error!(error = %detail, "Tool failed");
                Executed::Failed
            }
            Err(join_error) => {
                tracing::error!(error = %join_error, "Tool task aborted");
                Executed::Failed
            }
        }
    }

    fn class(&self) -> CallClass {
        match self {
            Executed::Value(_) => CallClass::Success,
            Executed::Declared(_) => CallClass::ToolError,
            Executed::Failed => CallClass::Internal,
        }
    }
}

fn internal_failure(tool_id: &str) -> Error {
    Error::internal(format!("Internal error while calling tool {tool_id}"))
}
