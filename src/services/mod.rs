use std::sync::Arc;

use crate::services::rag::RagEngine;
use crate::sessions::SessionStore;

pub mod ingest;
pub mod rag;

// A container for the shared services injected into the channel gateway
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RagEngine>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(engine: Arc<RagEngine>) -> Self {
        // RagEngine and the gateway share one session store
        let sessions = engine.sessions().clone();
        Self { engine, sessions }
    }
}
