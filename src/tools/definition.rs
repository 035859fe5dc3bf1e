//! Tool metadata - definitions, versions, auth requirements, public views.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::types::{Error, Result};

// =============================================================================
// Versions
// =============================================================================

/// Semver triple used to pick the latest of several same-named tools.
///
/// Ordering is lexicographic on (major, minor, patch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Default for SemVer {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SemVer {
    type Err = Error;

    /// Accepts `"1.2.3"`, `"1.2"` and `"2"`; missing parts are zero.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::validation(format!("invalid version '{s}'"));
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }
        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }
        Ok(Self::new(nums[0], nums[1], nums[2]))
    }
}

impl From<u64> for SemVer {
    fn from(major: u64) -> Self {
        Self::new(major, 0, 0)
    }
}

impl From<(u64, u64, u64)> for SemVer {
    fn from((major, minor, patch): (u64, u64, u64)) -> Self {
        Self::new(major, minor, patch)
    }
}

impl Serialize for SemVer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemVer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(major) => Ok(Self::from(major)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

// =============================================================================
// Auth requirement and injection
// =============================================================================

/// External grant a tool needs before it may run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequirement {
    provider: String,
    scopes: Vec<String>,
}

impl AuthRequirement {
    /// Scopes must be non-empty.
    pub fn new<I, S>(provider: impl Into<String>, scopes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = provider.into();
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
        if provider.is_empty() {
            return Err(Error::validation("auth provider cannot be empty"));
        }
        if scopes.is_empty() {
            return Err(Error::validation(format!(
                "auth requirement for provider '{provider}' needs at least one scope"
            )));
        }
        Ok(Self { provider, scopes })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Capability types the dispatcher knows how to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityType {
    /// The inbound call-API request.
    CallerRequest,
}

/// A parameter filled by the dispatcher instead of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedParam {
    pub name: String,
    pub capability: CapabilityType,
}

impl InjectedParam {
    pub fn caller_request(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capability: CapabilityType::CallerRequest,
        }
    }
}

// =============================================================================
// Tool declarations
// =============================================================================

/// What a tool declares about itself.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Defaults to `name` when absent.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    /// `None` means unconstrained.
    pub output_schema: Option<Value>,
    pub injected: Vec<InjectedParam>,
    pub auth: Option<AuthRequirement>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            input_schema,
            output_schema: None,
            injected: Vec::new(),
            auth: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_injected(mut self, param: InjectedParam) -> Self {
        self.injected.push(param);
        self
    }

    pub fn with_auth(mut self, auth: AuthRequirement) -> Self {
        self.auth = Some(auth);
        self
    }
}

// =============================================================================
// Registered definition and public view
// =============================================================================

/// A tool as the catalog stores it. Immutable once registered.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Client-facing input schema (injected parameters removed).
    pub input_schema: Value,
    /// `{}` when unconstrained.
    pub output_schema: Value,
    pub permissions: BTreeSet<String>,
    pub injected: Vec<InjectedParam>,
    pub auth: Option<AuthRequirement>,
    pub version: SemVer,
}

impl ToolDefinition {
    pub fn requires(&self, capability: CapabilityType) -> bool {
        self.injected.iter().any(|p| p.capability == capability)
    }

    pub fn view(&self) -> ToolView {
        ToolView {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
            version: Some(self.version),
        }
    }
}

/// Public projection returned by `GET /` and read back by remote clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolView {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
    #[serde(default = "any_schema")]
    pub output_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<SemVer>,
}

impl ToolView {
    /// Missing versions count as `1.0.0`.
    pub fn version_or_default(&self) -> SemVer {
        self.version.unwrap_or_default()
    }
}

/// The unconstrained schema.
pub fn any_schema() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_semver_parsing() {
        assert_eq!("1.2.3".parse::<SemVer>().unwrap(), SemVer::new(1, 2, 3));
        assert_eq!("2".parse::<SemVer>().unwrap(), SemVer::new(2, 0, 0));
        assert_eq!("0.4".parse::<SemVer>().unwrap(), SemVer::new(0, 4, 0));
        assert!("1.x".parse::<SemVer>().is_err());
        assert!("1.2.3.4".parse::<SemVer>().is_err());
        assert!("".parse::<SemVer>().is_err());
    }

    #[test]
    fn test_semver_ordering_is_lexicographic() {
        assert!(SemVer::new(1, 2, 0) > SemVer::new(1, 0, 9));
        assert!(SemVer::new(2, 0, 0) > SemVer::new(1, 99, 99));
        assert_eq!(SemVer::default(), SemVer::new(1, 0, 0));
    }

    #[test]
    fn test_semver_serde_accepts_ints_and_strings() {
        let v: SemVer = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(v, SemVer::new(3, 0, 0));
        let v: SemVer = serde_json::from_value(json!("1.2.0")).unwrap();
        assert_eq!(serde_json::to_value(v).unwrap(), json!("1.2.0"));
    }

    #[test]
    fn test_auth_requirement_needs_scopes() {
        assert!(AuthRequirement::new("github", Vec::<String>::new()).is_err());
        assert!(AuthRequirement::new("", ["repo"]).is_err());
        let req = AuthRequirement::new("github", ["repo"]).unwrap();
        assert_eq!(req.provider(), "github");
        assert_eq!(req.scopes(), ["repo".to_string()]);
    }

    #[test]
    fn test_view_defaults_when_reading_remote_entries() {
        let view: ToolView = serde_json::from_value(json!({
            "id": "add",
            "name": "add",
            "input_schema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(view.output_schema, json!({}));
        assert_eq!(view.version_or_default(), SemVer::new(1, 0, 0));
    }
}
