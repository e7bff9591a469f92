//! Role Type Aggregate

pub mod api;
pub mod entity;

pub use api::role_types_router;
pub use entity::{RoleType, RoleTypeInsert, RoleTypeUpdate};
