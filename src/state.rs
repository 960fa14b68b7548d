use std::sync::Arc;

use crate::config::Config;
use crate::kv::MemoryKv;
use crate::submission::Orchestrator;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub orchestrator: Orchestrator,
    /// Set when the built-in store backs the orchestrator, so expired keys can be swept.
    pub memory_kv: Option<Arc<MemoryKv>>,
}
