//! HTTP API for the average bot
//!
//! Transports post user interactions here and relay the returned effects;
//! messages for other users are picked up from the outbox stream.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::{OutboxChannel, RuntimeManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    pub outbox: OutboxChannel,
}

impl AppState {
    pub fn new(runtime: Arc<RuntimeManager>, outbox: OutboxChannel) -> Self {
        Self { runtime, outbox }
    }
}
