//! Tool access control - the visibility predicate.
//!
//! Listing and invocation share this one rule so a caller can never see a
//! tool it cannot call, or call a tool it cannot see.

use super::definition::{CapabilityType, ToolDefinition};
use crate::types::CallerContext;

/// Caller → tool access policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    auth_enabled: bool,
}

impl AccessPolicy {
    pub fn new(auth_enabled: bool) -> Self {
        Self { auth_enabled }
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Check whether `caller` may see and call `definition`.
    ///
    /// 1. A tool that needs the inbound request is hidden when there is none.
    /// 2. With auth disabled, or no required permissions, everything else is
    ///    allowed.
    /// 3. Otherwise the caller's scopes must cover every permission.
    pub fn is_allowed(&self, definition: &ToolDefinition, caller: &CallerContext) -> bool {
        if definition.requires(CapabilityType::CallerRequest) && caller.request().is_none() {
            return false;
        }
        if !self.auth_enabled || definition.permissions.is_empty() {
            return true;
        }
        caller.has_scopes(&definition.permissions)
    }
}
