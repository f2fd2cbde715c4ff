//! Persistence collaborator
//!
//! The orchestrator only needs to create a section, append utterances and
//! close the section. Reads back utterances for the transcript endpoint.

mod memory;
mod models;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RelayResult;

pub use memory::MemoryStore;
pub use models::{NewSection, Section, SessionRecord, Utterance};

#[async_trait]
pub trait SectionStore: Send + Sync {
    /// Persist a new section, creating its parent session when none is given
    async fn create_section(&self, new: NewSection) -> RelayResult<Section>;

    /// Append one utterance to a section
    async fn save_utterance(
        &self,
        section_id: Uuid,
        original_text: &str,
        translated_text: &str,
    ) -> RelayResult<Utterance>;

    /// Stamp the end time and final audio paths; `NotFound` if the section is gone
    async fn end_section(
        &self,
        section_id: Uuid,
        original_audio_path: Option<String>,
        translated_audio_path: Option<String>,
    ) -> RelayResult<bool>;

    async fn section(&self, section_id: Uuid) -> RelayResult<Option<Section>>;

    /// Utterances of a section in creation order
    async fn utterances(&self, section_id: Uuid) -> RelayResult<Vec<Utterance>>;
}
