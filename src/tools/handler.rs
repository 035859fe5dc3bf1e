//! Tool capability interface.
//!
//! Every callable shape is normalized at registration into one [`Tool`]:
//! `describe()` yields the declared [`ToolSpec`], `invoke()` runs the body.
//! Plain closures are adapted by [`FnTool`].

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::definition::ToolSpec;
use crate::envelope::ToolError;
use crate::types::RequestInfo;

/// Failure returned by a tool body.
#[derive(Debug, thiserror::Error)]
pub enum ToolFailure {
    /// Structured error passed through to the caller in full.
    #[error("{0}")]
    Declared(ToolError),

    /// Anything else. The caller only sees a generic internal error.
    #[error("{0}")]
    Other(String),
}

impl ToolFailure {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<ToolError> for ToolFailure {
    fn from(error: ToolError) -> Self {
        Self::Declared(error)
    }
}

impl From<serde_json::Error> for ToolFailure {
    fn from(error: serde_json::Error) -> Self {
        Self::Other(error.to_string())
    }
}

/// Value filled in by the dispatcher for an injected parameter.
#[derive(Debug, Clone)]
pub enum Injected {
    CallerRequest(Arc<RequestInfo>),
}

/// Validated caller input plus injected values.
#[derive(Debug, Clone, Default)]
pub struct ToolArguments {
    pub input: Map<String, Value>,
    pub injected: HashMap<String, Injected>,
}

impl ToolArguments {
    pub fn new(input: Map<String, Value>) -> Self {
        Self {
            input,
            injected: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.input.get(name)
    }

    /// Deserialize the caller input into a typed struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolFailure> {
        Ok(serde_json::from_value(Value::Object(self.input.clone()))?)
    }

    /// The inbound request injected under `name`.
    pub fn request(&self, name: &str) -> Option<&RequestInfo> {
        match self.injected.get(name) {
            Some(Injected::CallerRequest(request)) => Some(request),
            None => None,
        }
    }
}

/// One callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn describe(&self) -> ToolSpec;

    async fn invoke(&self, args: ToolArguments) -> Result<Value, ToolFailure>;
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<Value, ToolFailure>> + Send>>;
type ToolFn = dyn Fn(ToolArguments) -> ToolFuture + Send + Sync;

/// Adapts an async closure into a [`Tool`].
pub struct FnTool {
    spec: ToolSpec,
    func: Box<ToolFn>,
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.spec.name)
            .finish_non_exhaustive()
    }
}

impl FnTool {
    /// Closure over raw arguments with an explicit spec.
    pub fn new<F, Fut>(spec: ToolSpec, func: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolFailure>> + Send + 'static,
    {
        Self {
            spec,
            func: Box::new(move |args| Box::pin(func(args))),
        }
    }

    /// Typed closure; input and output schemas are derived from `A` and `R`.
    ///
    /// An output schema that cannot be rendered is left unconstrained.
    pub fn typed<A, R, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        func: F,
    ) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + JsonSchema + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolFailure>> + Send + 'static,
    {
        let input_schema = serde_json::to_value(schemars::schema_for!(A))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        let output_schema = serde_json::to_value(schemars::schema_for!(R)).ok();

        let mut spec = ToolSpec::new(name, description, input_schema);
        spec.output_schema = output_schema;

        let func = Arc::new(func);
        Self::new(spec, move |args: ToolArguments| {
            let func = Arc::clone(&func);
            async move {
                let typed: A = args.parse()?;
                let out = func(typed).await?;
                Ok(serde_json::to_value(out)?)
            }
        })
    }

    pub fn with_spec(mut self, f: impl FnOnce(ToolSpec) -> ToolSpec) -> Self {
        self.spec = f(self.spec);
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn describe(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn invoke(&self, args: ToolArguments) -> Result<Value, ToolFailure> {
        (self.func)(args).await
    }
}
