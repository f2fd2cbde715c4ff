use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use tracing::{debug, info};

use super::messages::{AudioFrameMessage, StartReplyMessage, StartTranslationMessage};

/// Subject the translation worker listens on for new recognizers
pub const START_SUBJECT: &str = "translation.start";

#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Subject carrying a section's audio frames
    pub fn audio_subject(section_id: &str) -> String {
        format!("audio.frame.section-{}", section_id)
    }

    /// Subject carrying a section's recognition and synthesis results
    pub fn result_subject(section_id: &str) -> String {
        format!("translation.result.{}", section_id)
    }

    /// Ask the worker to start recognizing a section and wait for its answer
    ///
    /// Fails fast when no worker listens on the start subject.
    pub async fn request_start(&self, message: &StartTranslationMessage) -> Result<StartReplyMessage> {
        let payload = serde_json::to_vec(message)?;

        let response = self
            .client
            .request(START_SUBJECT.to_string(), payload.into())
            .await
            .context("Translation worker did not answer start request")?;

        let reply: StartReplyMessage =
            serde_json::from_slice(&response.payload).context("Invalid start reply")?;

        info!(
            "Start request for section {} ({} -> {}, voice {}): accepted={}",
            message.section_id,
            message.source_language,
            message.target_language,
            message.voice,
            reply.accepted
        );

        Ok(reply)
    }

    /// Publish audio frame to NATS
    pub async fn publish_audio_frame(
        &self,
        section_id: &str,
        pcm_bytes: &[u8],
        sample_rate: u32,
        channels: u16,
        sequence: u32,
        is_final: bool,
    ) -> Result<()> {
        let subject = Self::audio_subject(section_id);

        let message = AudioFrameMessage {
            section_id: section_id.to_string(),
            sequence,
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm_bytes),
            sample_rate,
            channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
            final_frame: is_final,
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        debug!(
            "Published audio frame to {} (seq={}, bytes={}, final={})",
            subject,
            sequence,
            pcm_bytes.len(),
            is_final
        );

        Ok(())
    }

    /// Subscribe to a section's translation results
    pub async fn subscribe_results(&self, section_id: &str) -> Result<async_nats::Subscriber> {
        let subject = Self::result_subject(section_id);

        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .context("Failed to subscribe to translation results")?;

        info!("Subscribed to {}", subject);

        Ok(subscriber)
    }
}
