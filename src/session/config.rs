use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client request to start translating on a connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Existing parent session to append a section to
    #[serde(default)]
    pub session_id: Option<Uuid>,

    /// Spoken language tag (e.g. "en-US")
    pub source_language: String,

    /// Translation and synthesis language tag (e.g. "tr-TR")
    pub target_language: String,

    /// Skip capturing and pushing synthesized audio
    #[serde(default)]
    pub is_muted: bool,
}

impl StartSessionRequest {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            session_id: None,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            is_muted: false,
        }
    }

    pub fn muted(mut self, is_muted: bool) -> Self {
        self.is_muted = is_muted;
        self
    }
}
