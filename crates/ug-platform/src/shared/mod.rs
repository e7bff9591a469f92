//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod api_common;
pub mod authorization_service;
pub mod error;
pub mod middleware;

// APIs
pub mod health_api;

// Re-export commonly used items
pub use api_common::{MutationResult, PageQuery};
pub use authorization_service::{
    AuthenticatedPolicy, AuthorizationPolicy, Caller, Decision, FieldDescriptor, Operation,
    Resource, RoleBasedPolicy,
};
pub use error::{PlatformError, Result};
pub use health_api::health_router;
pub use middleware::{AppState, RequestContext};
