//! UG Platform
//!
//! User and group management over an RBAC entity model:
//! - Users, groups and the group tree
//! - Group types, role categories and role types
//! - Memberships and roles binding users to groups
//! - Request-scoped batched loaders with optimistic concurrency on update
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Entity, insert and update types plus relation resolvers
//! - `api` - REST endpoints

// Aggregates
pub mod user;
pub mod group;
pub mod group_type;
pub mod role_category;
pub mod role_type;
pub mod role;
pub mod membership;

// Data access
pub mod store;
pub mod loader;
pub mod resolver;

// Shared infrastructure
pub mod shared;
pub mod router;
pub mod seed;

// Re-export common types from shared
pub use shared::error::{PlatformError, Result};
pub use shared::authorization_service::{build_policy, AuthorizationPolicy, Caller};
pub use shared::middleware::{AppState, RequestContext};

// Re-export main entity types for convenience
pub use user::entity::User;
pub use group::entity::Group;
pub use group_type::entity::GroupType;
pub use role_category::entity::RoleCategory;
pub use role_type::entity::RoleType;
pub use role::entity::Role;
pub use membership::entity::Membership;

// Re-export data access
pub use store::{connect, schema::init_schema, Stores, UpdateOutcome};
pub use loader::{Loader, LoaderRegistry, LoaderSettings};

pub use router::api_router;
pub use seed::DemoSeeder;
