//! Group Aggregate

pub mod api;
pub mod entity;

pub use api::groups_router;
pub use entity::{Group, GroupInsert, GroupUpdate};
