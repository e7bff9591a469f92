//! Role Category Aggregate

pub mod api;
pub mod entity;

pub use api::role_categories_router;
pub use entity::{RoleCategory, RoleCategoryInsert, RoleCategoryUpdate};
