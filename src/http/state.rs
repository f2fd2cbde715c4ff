use std::collections::HashMap;
use std::sync::Arc;

use super::hub::ConnectionHub;
use crate::orchestrator::Orchestrator;
use crate::store::SectionStore;

/// Shared application state for HTTP and WebSocket handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,

    /// Outbound queues per connection
    pub hub: Arc<ConnectionHub>,

    pub store: Arc<dyn SectionStore>,

    /// Access token → user id
    pub access_tokens: Arc<HashMap<String, String>>,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        hub: Arc<ConnectionHub>,
        store: Arc<dyn SectionStore>,
        access_tokens: HashMap<String, String>,
    ) -> Self {
        Self {
            orchestrator,
            hub,
            store,
            access_tokens: Arc::new(access_tokens),
        }
    }

    /// User behind an access token, if any
    pub fn user_for(&self, token: Option<&str>) -> Option<String> {
        token.and_then(|t| self.access_tokens.get(t).cloned())
    }
}
