//! Per-request caller context.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Snapshot of the inbound transport request.
///
/// Tools that declare a `caller_request` injection receive this object. It is
/// only present on transports that have a real inbound request (the call
/// API); the MCP bridge never has one.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    /// Lower-cased header names.
    pub headers: BTreeMap<String, String>,
    /// Identity established by the authenticator, if any.
    pub identity: Option<String>,
}

impl RequestInfo {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Opaque per-call authorization state.
#[derive(Debug, Clone, Default)]
pub struct CallerContext {
    identity: Option<String>,
    scopes: BTreeSet<String>,
    request: Option<Arc<RequestInfo>>,
}

impl CallerContext {
    /// Caller with no identity, no scopes and no inbound request.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated<I, S>(identity: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identity: Some(identity.into()),
            scopes: scopes.into_iter().map(Into::into).collect(),
            request: None,
        }
    }

    /// Attach the inbound request so it can be injected into tools.
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(Arc::new(request));
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn request(&self) -> Option<&Arc<RequestInfo>> {
        self.request.as_ref()
    }

    /// Exact-match superset check, no scope hierarchy.
    pub fn has_scopes(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.scopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_scopes_is_exact_match() {
        let caller = CallerContext::authenticated("alice", ["admin:read"]);
        let admin: BTreeSet<String> = ["admin".to_string()].into_iter().collect();
        assert!(!caller.has_scopes(&admin));
        assert!(caller.has_scopes(&BTreeSet::new()));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut request = RequestInfo::default();
        request
            .headers
            .insert("x-api-key".to_string(), "k1".to_string());
        assert_eq!(request.header("X-Api-Key"), Some("k1"));
    }
}
