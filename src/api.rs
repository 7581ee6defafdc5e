//! HTTP and WebSocket surface
//!
//! `GET /ws` upgrades to one template-design session per socket. The rest
//! is read-only metadata.

mod handlers;
mod types;
mod ws;

pub use handlers::create_router;
pub use types::*;

use crate::llm::ModelRegistry;
use crate::session::Orchestrator;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub llm_registry: Arc<ModelRegistry>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, llm_registry: Arc<ModelRegistry>) -> Self {
        Self {
            orchestrator,
            llm_registry,
        }
    }
}
