//! Request validation utilities.
//!
//! Payload validation uses standard JSON Schema semantics. Validators are
//! compiled once at registration and reused for every call.

use serde_json::Value;
use std::fmt;

use crate::types::{Error, Result};

/// Validate that a string is not empty.
pub fn validate_non_empty(s: &str, field: &str) -> Result<()> {
    if s.is_empty() {
        return Err(Error::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// True when the schema describes a JSON object (`"type": "object"`).
pub fn is_object_schema(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.len() == 1 && types[0] == "object",
        _ => false,
    }
}

/// A compiled input schema.
pub struct PayloadValidator {
    schema: Value,
    inner: jsonschema::Validator,
}

impl fmt::Debug for PayloadValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadValidator")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl PayloadValidator {
    /// Compile a schema. A schema that is not valid JSON Schema is an
    /// unsupported tool shape.
    pub fn compile(schema: &Value) -> Result<Self> {
        let inner = jsonschema::validator_for(schema)
            .map_err(|e| Error::unsupported_shape(format!("invalid input schema: {e}")))?;
        Ok(Self {
            schema: schema.clone(),
            inner,
        })
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn is_valid(&self, payload: &Value) -> bool {
        payload.is_object() && self.inner.is_valid(payload)
    }

    /// Validate a call payload. The error cites the tool, the payload, the
    /// schema and every validator message.
    pub fn validate(&self, tool_id: &str, payload: &Value) -> Result<()> {
        let mut problems: Vec<String> = Vec::new();
        if !payload.is_object() {
            problems.push("payload must be a JSON object".to_string());
        } else {
            problems.extend(self.inner.iter_errors(payload).map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            }));
        }

        if problems.is_empty() {
            return Ok(());
        }

        Err(Error::validation(format!(
            "Invalid payload for tool call to tool {} with args {} and schema {}: {}",
            tool_id,
            payload,
            self.schema,
            problems.join("; ")
        )))
    }
}
