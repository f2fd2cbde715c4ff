use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::Orchestrator;
use crate::provider::ProviderEvent;
use crate::session::Session;

/// Event pushed back to the connection that owns a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    ReceiveUtterance {
        original_text: String,
        translated_text: String,
        section_id: Uuid,
    },
    /// Base64-encoded synthesized PCM
    ReceiveAudio { audio: String },
}

impl ClientEvent {
    pub fn audio(bytes: &[u8]) -> Self {
        ClientEvent::ReceiveAudio {
            audio: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Best-effort push channel to a single connection
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, connection_id: &str, event: ClientEvent);
}

impl Orchestrator {
    /// Serialize one session's provider events until the provider drains
    pub(super) async fn run_event_loop(
        self,
        session: Arc<Session>,
        mut events: mpsc::Receiver<ProviderEvent>,
    ) {
        let connection_id = session.connection_id().to_string();
        let section_id = session.section_id();
        info!("Event loop started for section {}", section_id);

        while let Some(event) = events.recv().await {
            match event {
                ProviderEvent::Recognized {
                    original,
                    translations,
                } => {
                    let translated = match translation_for(&translations, session.target_language()) {
                        Some(text) => text.to_string(),
                        _ => {
                            debug!(
                                "Skipping recognition without {} translation: {:?}",
                                session.target_language(),
                                original
                            );
                            continue;
                        }
                    };

                    match self
                        .inner
                        .store
                        .save_utterance(section_id, &original, &translated)
                        .await
                    {
                        Ok(_) => session.record_utterance(),
                        Err(e) => error!("Failed to save utterance for section {}: {}", section_id, e),
                    }

                    self.inner
                        .publisher
                        .publish(
                            &connection_id,
                            ClientEvent::ReceiveUtterance {
                                original_text: original,
                                translated_text: translated,
                                section_id,
                            },
                        )
                        .await;
                }

                ProviderEvent::Synthesizing(audio) => {
                    if audio.is_empty() || session.is_muted() {
                        continue;
                    }

                    match session.write_translated(&audio).await {
                        Ok(true) => {
                            self.inner
                                .publisher
                                .publish(&connection_id, ClientEvent::audio(&audio))
                                .await;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            error!("Translated capture failed for section {}: {}", section_id, e);
                            self.schedule_teardown(&connection_id, section_id);
                        }
                    }
                }

                ProviderEvent::Canceled { reason } => {
                    warn!("Provider canceled section {}: {}", section_id, reason);
                    self.schedule_teardown(&connection_id, section_id);
                }
            }
        }

        info!("Event loop finished for section {}", section_id);
    }

    /// End a session from inside its own event loop without waiting on it
    fn schedule_teardown(&self, connection_id: &str, section_id: Uuid) {
        let orchestrator = self.clone();
        let connection_id = connection_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = orchestrator.end_section_of(&connection_id, section_id).await {
                error!("Forced teardown of section {} failed: {}", section_id, e);
            }
        });
    }
}

/// Non-empty translation for a language tag, falling back to its primary
/// subtag (`tr-TR` → `tr`)
fn translation_for<'a>(translations: &'a HashMap<String, String>, language: &str) -> Option<&'a str> {
    let primary = language.split('-').next().unwrap_or(language);
    translations
        .get(language)
        .or_else(|| translations.get(primary))
        .map(String::as_str)
        .filter(|text| !text.is_empty())
}
