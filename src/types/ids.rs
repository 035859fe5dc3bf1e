//! Strongly-typed identifiers.
//!
//! Ids are opaque non-empty strings. Call ids default to a fresh UUID v4.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines a non-empty string id newtype: `from_string()`, `as_str()`,
/// Display and transparent serde. The `uuid` form adds `new()` (UUID v4) and
/// `Default` on top.
macro_rules! define_id {
    ($name:ident, uuid) => {
        define_id!($name);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn from_string(s: String) -> Result<Self, &'static str> {
                if s.is_empty() {
                    return Err(concat!(stringify!($name), " cannot be empty"));
                }
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(CallId, uuid);
define_id!(TraceId);

impl CallId {
    /// Use the caller-supplied id when present and non-empty, else mint one.
    pub fn resolve(supplied: Option<String>) -> Self {
        supplied
            .and_then(|s| Self::from_string(s).ok())
            .unwrap_or_default()
    }
}
