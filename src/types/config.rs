//! Configuration structures.
//!
//! Configuration is loaded from an optional JSON file and then overridden by
//! `TOOLSERVER_*` environment variables.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

use super::errors::{Error, Result};

/// Global server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Call API server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Caller authentication and external auth service.
    #[serde(default)]
    pub auth: AuthConfig,

    /// MCP bridge configuration.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration: JSON file (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                serde_json::from_str::<Config>(&raw)?
            }
            None => Config::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `TOOLSERVER_*` overrides from the given lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = lookup("TOOLSERVER_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(enabled) = lookup("TOOLSERVER_AUTH_ENABLED") {
            self.auth.enabled = parse_bool("TOOLSERVER_AUTH_ENABLED", &enabled)?;
        }
        if let Some(url) = lookup("TOOLSERVER_AUTH_SERVICE_URL") {
            self.auth.service.get_or_insert_with(AuthServiceConfig::default).base_url = url;
        }
        if let Some(key) = lookup("TOOLSERVER_AUTH_SERVICE_KEY") {
            self.auth.service.get_or_insert_with(AuthServiceConfig::default).api_key = Some(key);
        }
        if let Some(url) = lookup("TOOLSERVER_REMOTE_URL") {
            self.bridge.remote_url = url;
        }
        if let Some(format) = lookup("TOOLSERVER_LOG_FORMAT") {
            self.observability.json_logs = format.eq_ignore_ascii_case("json");
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::validation(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
}

/// Call API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub listen_addr: String,

    /// Per-request timeout. A timed-out call is abandoned by the transport;
    /// the tool body is not interrupted.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8002".to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Caller authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Enforce tool permissions. When false every caller sees every tool
    /// that does not need request injection.
    pub enabled: bool,

    /// API key → granted identity and scopes.
    #[serde(default)]
    pub api_keys: HashMap<String, ApiKeyGrant>,

    /// External auth service used by the per-tool auth hook.
    #[serde(default)]
    pub service: Option<AuthServiceConfig>,
}

/// Identity and scopes granted to one API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyGrant {
    pub identity: String,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

/// External auth service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthServiceConfig {
    /// Base URL; the hook posts to `{base_url}/authorize`.
    pub base_url: String,

    /// Sent as `x-api-key` when present.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// MCP bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the remote call API.
    pub remote_url: String,

    /// Extra headers sent with every remote request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Plain tool names to advertise. Empty advertises everything.
    #[serde(default)]
    pub allowed_tools: Vec<String>,

    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            remote_url: "http://127.0.0.1:8002".to_string(),
            headers: HashMap::new(),
            allowed_tools: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.auth.enabled);
        assert!(config.auth.service.is_none());
        assert_eq!(config.server.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_load_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "server": {{"listen_addr": "0.0.0.0:9000", "request_timeout": "5s"}},
                "auth": {{
                    "enabled": true,
                    "api_keys": {{"k1": {{"identity": "alice", "scopes": ["group1"]}}}}
                }}
            }}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout, Duration::from_secs(5));
        assert!(config.auth.enabled);
        assert_eq!(config.auth.api_keys["k1"].identity, "alice");
        assert!(config.auth.api_keys["k1"].scopes.contains("group1"));
        assert_eq!(config.bridge.remote_url, "http://127.0.0.1:8002");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        let env: HashMap<&str, &str> = [
            ("TOOLSERVER_AUTH_ENABLED", "true"),
            ("TOOLSERVER_AUTH_SERVICE_URL", "http://auth.local"),
            ("TOOLSERVER_LOG_FORMAT", "JSON"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(config.auth.enabled);
        assert_eq!(
            config.auth.service.as_ref().unwrap().base_url,
            "http://auth.local"
        );
        assert!(config.observability.json_logs);
    }

    #[test]
    fn test_env_override_rejects_bad_bool() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "TOOLSERVER_AUTH_ENABLED").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }
}
