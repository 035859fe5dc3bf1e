//! Tool infrastructure - definitions, catalog, access control, health.
//!
//! Tools are registered once into a [`ToolCatalog`], which is then shared
//! read-only with the dispatcher and the listing service.

pub mod access;
pub mod catalog;
pub mod definition;
pub mod handler;
pub mod health;

pub use access::AccessPolicy;
pub use catalog::{RegisteredTool, ToolCatalog};
pub use definition::{
    any_schema, AuthRequirement, CapabilityType, InjectedParam, SemVer, ToolDefinition, ToolSpec,
    ToolView,
};
pub use handler::{FnTool, Injected, Tool, ToolArguments, ToolFailure};
pub use health::{
    CallClass, CallObserver, CallRecord, HealthConfig, HealthStatus, NoopObserver,
    SystemHealthReport, ToolHealthTracker,
};
