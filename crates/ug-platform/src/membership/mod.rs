//! Membership Aggregate

pub mod api;
pub mod entity;

pub use api::memberships_router;
pub use entity::{Membership, MembershipInsert, MembershipUpdate};
