//! Catalog → MCP translation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::client::RemoteToolClient;
use super::content::{into_content, Content};
use super::BridgeError;
use crate::envelope::{CallOutcome, CallRequest};
use crate::tools::ToolView;

/// Tool as advertised over MCP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Re-exposes a remote catalog through MCP.
///
/// The advertised set is computed once at construction: latest version per
/// name, optionally narrowed by an allow-list of plain names.
pub struct ToolBridge {
    client: Arc<dyn RemoteToolClient>,
    tools: BTreeMap<String, ToolView>,
}

impl std::fmt::Debug for ToolBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBridge")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ToolBridge {
    /// Fetch the remote tool list and build the advertised set.
    pub async fn connect(
        client: Arc<dyn RemoteToolClient>,
        allowed: &[String],
    ) -> Result<Self, BridgeError> {
        if let Some(versioned) = allowed.iter().find(|name| name.contains('@')) {
            return Err(BridgeError::unsupported(format!(
                "Tool versions are not yet supported: {versioned}"
            )));
        }

        let remote = client.list().await?;
        let mut tools = latest_versions(remote);

        if !allowed.is_empty() {
            for name in allowed {
                if !tools.contains_key(name) {
                    tracing::warn!(tool = %name, "Allowed tool not offered by remote catalog");
                }
            }
            tools.retain(|name, _| allowed.contains(name));
        }

        tracing::info!(tools = tools.len(), "MCP bridge ready");
        Ok(Self { client, tools })
    }

    pub fn list_tools(&self) -> Vec<McpTool> {
        self.tools
            .values()
            .map(|view| McpTool {
                name: view.name.clone(),
                description: view.description.clone(),
                input_schema: view.input_schema.clone(),
            })
            .collect()
    }

    /// The advertised entry behind an MCP tool name.
    pub fn resolve(&self, name: &str) -> Option<&ToolView> {
        self.tools.get(name)
    }

    /// Call the latest version of `name`.
    ///
    /// A remote tool error or auth challenge has no MCP representation and
    /// fails with `Unsupported`.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<Vec<Content>, BridgeError> {
        let view = self
            .resolve(name)
            .ok_or_else(|| BridgeError::UnknownTool(name.to_string()))?;

        let response = self
            .client
            .call(CallRequest::new(view.id.clone(), Value::Object(arguments)))
            .await?;

        match response.outcome {
            CallOutcome::Success(value) => Ok(into_content(value)),
            CallOutcome::Error(error) => {
                tracing::error!(tool = %name, error = %error, "Remote tool error cannot be bridged");
                Err(BridgeError::unsupported(
                    "Support for error messages is not yet implemented.",
                ))
            }
            CallOutcome::AuthRequired(challenge) => {
                tracing::error!(tool = %name, auth_id = %challenge.auth_id, "Auth challenge cannot be bridged");
                Err(BridgeError::unsupported(
                    "Support for auth challenges is not yet implemented.",
                ))
            }
        }
    }
}

/// Keep the greatest version per tool name.
fn latest_versions(views: Vec<ToolView>) -> BTreeMap<String, ToolView> {
    let mut latest: BTreeMap<String, ToolView> = BTreeMap::new();
    for view in views {
        match latest.get(&view.name) {
            Some(current) if current.version_or_default() >= view.version_or_default() => {}
            _ => {
                latest.insert(view.name.clone(), view);
            }
        }
    }
    latest
}
