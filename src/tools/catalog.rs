//! Tool catalog - registration, lookup, compiled input validators.
//!
//! The catalog is built once, then shared read-only behind an `Arc`.
//! Registration is add-or-fail: an existing id is never overwritten.

use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::definition::{any_schema, SemVer, ToolDefinition};
use super::handler::Tool;
use crate::types::{Error, Result};
use crate::validation::{is_object_schema, validate_non_empty, PayloadValidator};

// =============================================================================
// Registered tool
// =============================================================================

/// A definition plus its compiled validator and implementation.
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    pub validator: PayloadValidator,
    pub handler: Arc<dyn Tool>,
}

impl fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// In-memory tool catalog keyed by tool id.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    entries: HashMap<String, RegisteredTool>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// Fails with `DuplicateRegistration` if the id exists and with
    /// `UnsupportedShape` if the input schema is not an object schema. The
    /// catalog is unchanged on failure.
    pub fn register<T>(
        &mut self,
        tool: T,
        permissions: impl IntoIterator<Item = impl Into<String>>,
        version: Option<SemVer>,
    ) -> Result<&ToolDefinition>
    where
        T: Tool + 'static,
    {
        self.register_arc(Arc::new(tool), permissions, version)
    }

    pub fn register_arc(
        &mut self,
        handler: Arc<dyn Tool>,
        permissions: impl IntoIterator<Item = impl Into<String>>,
        version: Option<SemVer>,
    ) -> Result<&ToolDefinition> {
        let spec = handler.describe();
        validate_non_empty(&spec.name, "Tool name")?;
        let id = spec.id.clone().unwrap_or_else(|| spec.name.clone());
        validate_non_empty(&id, "Tool id")?;

        if self.entries.contains_key(&id) {
            return Err(Error::duplicate(id));
        }

        let injected_names: Vec<&str> = spec.injected.iter().map(|p| p.name.as_str()).collect();
        let input_schema = strip_injected(spec.input_schema.clone(), &injected_names);
        if !is_object_schema(&input_schema) {
            return Err(Error::unsupported_shape(format!(
                "input schema of tool {id} must describe an object"
            )));
        }
        let validator = PayloadValidator::compile(&input_schema)?;
        let output_schema = resolve_output_schema(&id, spec.output_schema);

        let definition = ToolDefinition {
            id: id.clone(),
            name: spec.name,
            description: spec.description,
            input_schema,
            output_schema,
            permissions: permissions.into_iter().map(Into::into).collect::<BTreeSet<_>>(),
            injected: spec.injected,
            auth: spec.auth,
            version: version.unwrap_or_default(),
        };

        tracing::debug!(
            tool_id = %definition.id,
            version = %definition.version,
            permissions = definition.permissions.len(),
            "Registered tool"
        );

        let entry = self.entries.entry(id).or_insert(RegisteredTool {
            definition,
            validator,
            handler,
        });
        Ok(&entry.definition)
    }

    /// Register several public tools; stops at the first failure.
    pub fn register_all<I>(&mut self, tools: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        for tool in tools {
            self.register_arc(tool, Vec::<String>::new(), None)?;
        }
        Ok(())
    }

    pub fn get(&self, tool_id: &str) -> Option<&RegisteredTool> {
        self.entries.get(tool_id)
    }

    pub fn has_tool(&self, tool_id: &str) -> bool {
        self.entries.contains_key(tool_id)
    }

    /// List all tool ids, sorted.
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// List all definitions, sorted by id.
    pub fn list_entries(&self) -> Vec<&ToolDefinition> {
        let mut entries: Vec<&ToolDefinition> =
            self.entries.values().map(|e| &e.definition).collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Remove injected parameters from `properties` and `required`.
fn strip_injected(mut schema: Value, injected: &[&str]) -> Value {
    if injected.is_empty() {
        return schema;
    }
    if let Some(props) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        for name in injected {
            props.remove(*name);
        }
    }
    if let Some(required) = schema.get_mut("required").and_then(Value::as_array_mut) {
        required.retain(|r| r.as_str().map_or(true, |r| !injected.contains(&r)));
    }
    schema
}

/// Declared output schema, or `{}` when absent, trivially true or invalid.
fn resolve_output_schema(tool_id: &str, declared: Option<Value>) -> Value {
    match declared {
        None | Some(Value::Bool(true)) => any_schema(),
        Some(schema) => match jsonschema::validator_for(&schema) {
            Ok(_) => schema,
            Err(e) => {
                tracing::warn!(
                    tool_id = %tool_id,
                    error = %e,
                    "Unresolvable output schema, falling back to any"
                );
                any_schema()
            }
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
