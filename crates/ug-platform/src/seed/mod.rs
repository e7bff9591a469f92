//! Demo data

pub mod demo_seeder;

pub use demo_seeder::{DemoSeeder, DEMO_ADMIN_ID};
