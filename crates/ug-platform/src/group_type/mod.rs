//! Group Type Aggregate

pub mod api;
pub mod entity;

pub use api::group_types_router;
pub use entity::{GroupType, GroupTypeInsert, GroupTypeUpdate};
