//! Role Aggregate

pub mod api;
pub mod entity;

pub use api::roles_router;
pub use entity::{Role, RoleInsert, RoleUpdate};
