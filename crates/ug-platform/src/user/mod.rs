//! User Aggregate

pub mod api;
pub mod entity;

pub use api::users_router;
pub use entity::{User, UserInsert, UserUpdate};
