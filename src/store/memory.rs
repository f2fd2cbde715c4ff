use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{NewSection, Section, SessionRecord, Utterance};
use super::SectionStore;
use crate::error::{RelayError, RelayResult};

#[derive(Default)]
struct Tables {
    sessions: HashMap<Uuid, SessionRecord>,
    sections: HashMap<Uuid, Section>,
    /// section id → utterances in insertion order
    utterances: HashMap<Uuid, Vec<Utterance>>,
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_record(&self, id: Uuid) -> Option<SessionRecord> {
        self.tables.read().await.sessions.get(&id).cloned()
    }

    pub async fn remove_section(&self, id: Uuid) -> Option<Section> {
        let mut tables = self.tables.write().await;
        tables.utterances.remove(&id);
        tables.sections.remove(&id)
    }
}

#[async_trait]
impl SectionStore for MemoryStore {
    async fn create_section(&self, new: NewSection) -> RelayResult<Section> {
        let mut tables = self.tables.write().await;

        let session_id = match new.session_id {
            Some(id) => {
                if !tables.sessions.contains_key(&id) {
                    // Parent created elsewhere; adopt it under this user
                    let mut record = SessionRecord::new(&new.user_id);
                    record.id = id;
                    tables.sessions.insert(id, record);
                }
                id
            }
            None => {
                let record = SessionRecord::new(&new.user_id);
                let id = record.id;
                info!("Created session record {} for user {}", id, new.user_id);
                tables.sessions.insert(id, record);
                id
            }
        };

        let section = Section {
            id: Uuid::new_v4(),
            session_id,
            source_language: new.source_language,
            target_language: new.target_language,
            is_muted: new.is_muted,
            started_at: Utc::now(),
            ended_at: None,
            original_audio_path: None,
            translated_audio_path: None,
        };

        tables.sections.insert(section.id, section.clone());
        tables.utterances.insert(section.id, Vec::new());

        info!("Created section {} in session {}", section.id, session_id);
        Ok(section)
    }

    async fn save_utterance(
        &self,
        section_id: Uuid,
        original_text: &str,
        translated_text: &str,
    ) -> RelayResult<Utterance> {
        let mut tables = self.tables.write().await;

        let utterances = tables
            .utterances
            .get_mut(&section_id)
            .ok_or(RelayError::NotFound(section_id))?;

        let utterance = Utterance {
            id: Uuid::new_v4(),
            section_id,
            original_text: original_text.to_string(),
            translated_text: translated_text.to_string(),
            created_at: Utc::now(),
        };
        utterances.push(utterance.clone());

        debug!("Saved utterance {} for section {}", utterance.id, section_id);
        Ok(utterance)
    }

    async fn end_section(
        &self,
        section_id: Uuid,
        original_audio_path: Option<String>,
        translated_audio_path: Option<String>,
    ) -> RelayResult<bool> {
        let mut tables = self.tables.write().await;

        let section = tables
            .sections
            .get_mut(&section_id)
            .ok_or(RelayError::NotFound(section_id))?;

        section.ended_at = Some(Utc::now());
        section.original_audio_path = original_audio_path;
        section.translated_audio_path = translated_audio_path;

        info!("Ended section {}", section_id);
        Ok(true)
    }

    async fn section(&self, section_id: Uuid) -> RelayResult<Option<Section>> {
        Ok(self.tables.read().await.sections.get(&section_id).cloned())
    }

    async fn utterances(&self, section_id: Uuid) -> RelayResult<Vec<Utterance>> {
        let tables = self.tables.read().await;
        tables
            .utterances
            .get(&section_id)
            .cloned()
            .ok_or(RelayError::NotFound(section_id))
    }
}
