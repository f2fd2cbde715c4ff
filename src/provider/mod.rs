//! Speech translation engine interface
//!
//! The orchestrator drives an engine through three inbound calls
//! (`start`, `push_audio`, `stop`) and consumes its results from a
//! per-session channel returned by `start`. The channel closing means the
//! engine has drained.

mod nats;
mod voices;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::RelayResult;

pub use self::nats::{NatsProvider, NatsProviderFactory};
pub use voices::voice_for;

/// Capacity of each session's event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event raised by the engine for one session
///
/// For a single utterance every `Synthesizing` fragment arrives after its
/// `Recognized` event and before the next utterance's `Recognized`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// A finalized utterance, translations keyed by language tag
    Recognized {
        original: String,
        translations: HashMap<String, String>,
    },
    /// One fragment of synthesized target-language audio
    Synthesizing(Vec<u8>),
    /// The engine failed mid-session
    Canceled { reason: String },
}

/// What a provider instance is created for
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub section_id: Uuid,
    pub source_language: String,
    pub target_language: String,
    /// Synthesis voice for the target language
    pub voice: String,
}

impl ProviderSpec {
    pub fn new(section_id: Uuid, source_language: &str, target_language: &str) -> Self {
        Self {
            section_id,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            voice: voice_for(target_language).to_string(),
        }
    }
}

/// One engine instance, exclusively owned by a session
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Begin recognition
    ///
    /// Returns the receiver for this session's events.
    async fn start(&mut self) -> RelayResult<mpsc::Receiver<ProviderEvent>>;

    /// Feed one chunk of 16 kHz mono PCM
    async fn push_audio(&mut self, chunk: &[u8]) -> RelayResult<()>;

    /// Halt recognition; remaining events are still delivered before the
    /// channel closes
    async fn stop(&mut self) -> RelayResult<()>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Builds a provider per session
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn create(&self, spec: ProviderSpec) -> RelayResult<Box<dyn TranslationProvider>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_spec_resolves_voice() {
        let spec = ProviderSpec::new(Uuid::new_v4(), "en-US", "tr-TR");
        assert_eq!(spec.voice, "tr-TR-EmelNeural");
        assert_eq!(spec.source_language, "en-US");
    }
}
