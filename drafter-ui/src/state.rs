//! Shared application state for the drafting server.

use std::sync::Arc;

use drafter::agent::{AgentConfig, DraftingAgent};
use drafter::io::document_store::DocumentStore;
use drafter::io::gateway::GenerationGateway;

/// Gateway type shared by every request.
pub type SharedGateway = Box<dyn GenerationGateway + Send + Sync>;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded source corpus.
    pub store: Arc<DocumentStore>,
    /// Drafting agent; each request runs its own loop on it.
    pub agent: Arc<DraftingAgent<SharedGateway>>,
    /// Expected `X-API-Key` value. `None` disables the check.
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        store: Arc<DocumentStore>,
        gateway: SharedGateway,
        config: AgentConfig,
        api_key: Option<&str>,
    ) -> anyhow::Result<Self> {
        let agent = DraftingAgent::new(Arc::clone(&store), gateway, config)?;
        Ok(Self {
            store,
            agent: Arc::new(agent),
            api_key: api_key.filter(|key| !key.is_empty()).map(Arc::from),
        })
    }
}
