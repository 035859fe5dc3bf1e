//! Tool result → MCP content blocks.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    #[serde(rename = "resource")]
    Resource { resource: EmbeddedResource },
}

/// Resource embedded in a content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedResource {
    pub uri: String,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }
}

/// Raw image bytes a tool can return; encodes to an image content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageData {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// The JSON image wrapper understood by [`into_content`].
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": "image",
            "data": base64::engine::general_purpose::STANDARD.encode(&self.bytes),
            "mimeType": self.mime_type,
        })
    }
}

impl From<ImageData> for Content {
    fn from(image: ImageData) -> Self {
        Content::Image {
            data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            mime_type: image.mime_type,
        }
    }
}

/// Convert a tool result into content blocks.
///
/// `null` yields nothing, arrays flatten element by element, typed content
/// and image wrappers pass through, strings become text and everything else
/// becomes its JSON text.
pub fn into_content(value: Value) -> Vec<Content> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().flat_map(into_content).collect(),
        Value::String(text) => vec![Content::Text { text }],
        other => {
            if is_typed_content(&other) {
                if let Ok(content) = serde_json::from_value::<Content>(other.clone()) {
                    return vec![content];
                }
            }
            vec![as_json_text(&other)]
        }
    }
}

fn is_typed_content(value: &Value) -> bool {
    matches!(
        value.get("type").and_then(Value::as_str),
        Some("text" | "image" | "resource")
    )
}

fn as_json_text(value: &Value) -> Content {
    let text = serde_json::to_string(value).unwrap_or_else(|_| value.to_string());
    Content::Text { text }
}
