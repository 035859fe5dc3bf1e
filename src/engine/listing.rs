//! Listing service.

use super::ToolEngine;
use crate::tools::ToolView;
use crate::types::CallerContext;

impl ToolEngine {
    /// Every tool the caller may call, sorted by id.
    pub fn list(&self, caller: &CallerContext) -> Vec<ToolView> {
        self.catalog
            .list_entries()
            .into_iter()
            .filter(|def| self.policy.is_allowed(def, caller))
            .map(|def| def.view())
            .collect()
    }
}
