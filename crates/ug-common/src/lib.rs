//! Shared building blocks for the UG services.

pub mod logging;

pub use logging::{init_logging, LogFormat};
