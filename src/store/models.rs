use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Parent container grouping the sections a user recorded together
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: format!("Session - {}", now.format("%d.%m.%Y %H:%M")),
            created_at: now,
        }
    }
}

/// One continuous transcription run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub session_id: Uuid,
    pub source_language: String,
    pub target_language: String,
    pub is_muted: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub original_audio_path: Option<String>,
    pub translated_audio_path: Option<String>,
}

/// One recognized-and-translated phrase; never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utterance {
    pub id: Uuid,
    pub section_id: Uuid,
    pub original_text: String,
    pub translated_text: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a section
#[derive(Debug, Clone)]
pub struct NewSection {
    pub user_id: String,
    /// Existing parent session; a new one is created when absent
    pub session_id: Option<Uuid>,
    pub source_language: String,
    pub target_language: String,
    pub is_muted: bool,
}
