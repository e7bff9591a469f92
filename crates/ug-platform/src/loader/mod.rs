//! Request-scoped batched loaders
//!
//! A [`LoaderRegistry`] is built for every inbound request and owns one
//! [`Loader`] per entity kind. Loaders cache by key for the lifetime of the
//! request and coalesce concurrent key lookups into one backend call.

pub mod batch_loader;
pub mod registry;

use std::time::Duration;

pub use batch_loader::Loader;
pub use registry::{LoaderRegistry, RegisteredEntity};

use crate::store::MAX_BIND_PARAMETERS;

/// Batching knobs shared by all loaders of a process.
#[derive(Debug, Clone, Copy)]
pub struct LoaderSettings {
    /// Keys per backend batch; a full batch is sealed and the next key opens a new one.
    pub max_batch_size: usize,
    /// Wait before a batch is dispatched. Zero dispatches after one scheduler tick.
    pub batch_delay: Duration,
}

impl LoaderSettings {
    pub fn new(max_batch_size: usize, batch_delay_ms: u64) -> Self {
        Self {
            max_batch_size: max_batch_size.clamp(1, MAX_BIND_PARAMETERS),
            batch_delay: Duration::from_millis(batch_delay_ms),
        }
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::new(256, 0)
    }
}
