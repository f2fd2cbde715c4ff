use async_trait::async_trait;
use base64::Engine;
use futures::stream::StreamExt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::{ProviderEvent, ProviderFactory, ProviderSpec, TranslationProvider, EVENT_CHANNEL_CAPACITY};
use crate::audio::wav::{CHANNELS, SAMPLE_RATE};
use crate::error::{RelayError, RelayResult};
use crate::nats::{NatsClient, StartTranslationMessage, TranslationResultMessage};

/// Translation engine reached through a NATS worker
pub struct NatsProvider {
    client: NatsClient,
    spec: ProviderSpec,
    section_id: String,
    start_timeout: Duration,
    stop_timeout: Duration,
    sequence: u32,
    listener: Option<JoinHandle<()>>,
    stopped_rx: Option<oneshot::Receiver<()>>,
}

impl NatsProvider {
    pub fn new(client: NatsClient, spec: ProviderSpec, start_timeout: Duration, stop_timeout: Duration) -> Self {
        let section_id = spec.section_id.to_string();
        Self {
            client,
            spec,
            section_id,
            start_timeout,
            stop_timeout,
            sequence: 0,
            listener: None,
            stopped_rx: None,
        }
    }

    async fn open(&mut self) -> anyhow::Result<mpsc::Receiver<ProviderEvent>> {
        // Subscribe before asking the worker to start so no result is missed
        let mut subscriber = self.client.subscribe_results(&self.section_id).await?;

        self.client
            .request_start(&StartTranslationMessage {
                section_id: self.section_id.clone(),
                source_language: self.spec.source_language.clone(),
                target_language: self.spec.target_language.clone(),
                voice: self.spec.voice.clone(),
                sample_rate: SAMPLE_RATE,
                timestamp: chrono::Utc::now().to_rfc3339(),
            })
            .await?
            .into_result()
            .map_err(|reason| anyhow::anyhow!("engine refused section {}: {}", self.section_id, reason))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stopped_tx, stopped_rx) = oneshot::channel();
        let section_id = self.section_id.clone();

        let listener = tokio::spawn(async move {
            info!("Translation listener started for section {}", section_id);

            while let Some(msg) = subscriber.next().await {
                let event = match map_result(&msg.payload) {
                    ListenerStep::Emit(event) => event,
                    ListenerStep::Skip => continue,
                    ListenerStep::Stop => break,
                };

                if event_tx.send(event).await.is_err() {
                    break;
                }
            }

            let _ = stopped_tx.send(());
            info!("Translation listener stopped for section {}", section_id);
        });

        self.listener = Some(listener);
        self.stopped_rx = Some(stopped_rx);

        Ok(event_rx)
    }
}

/// What the listener does with one result payload
#[derive(Debug, PartialEq)]
enum ListenerStep {
    Emit(ProviderEvent),
    Skip,
    /// Worker drained; closing the channel tells the session
    Stop,
}

fn map_result(payload: &[u8]) -> ListenerStep {
    match serde_json::from_slice::<TranslationResultMessage>(payload) {
        Ok(TranslationResultMessage::Recognized {
            original_text,
            translations,
        }) => ListenerStep::Emit(ProviderEvent::Recognized {
            original: original_text,
            translations,
        }),
        Ok(TranslationResultMessage::Synthesizing { audio }) => {
            match base64::engine::general_purpose::STANDARD.decode(&audio) {
                Ok(bytes) => ListenerStep::Emit(ProviderEvent::Synthesizing(bytes)),
                Err(e) => {
                    warn!("Dropping undecodable audio fragment: {}", e);
                    ListenerStep::Skip
                }
            }
        }
        Ok(TranslationResultMessage::Canceled { reason }) => {
            ListenerStep::Emit(ProviderEvent::Canceled { reason })
        }
        Ok(TranslationResultMessage::Stopped) => ListenerStep::Stop,
        Err(e) => {
            warn!("Failed to parse translation result: {}", e);
            ListenerStep::Skip
        }
    }
}

#[async_trait]
impl TranslationProvider for NatsProvider {
    async fn start(&mut self) -> RelayResult<mpsc::Receiver<ProviderEvent>> {
        if self.listener.is_some() {
            return Err(RelayError::InvalidState("provider already started".to_string()));
        }

        match timeout(self.start_timeout, self.open()).await {
            Ok(Ok(rx)) => Ok(rx),
            Ok(Err(e)) => Err(RelayError::ProviderFailure(format!("{:#}", e))),
            Err(_) => Err(RelayError::ProviderFailure(format!(
                "engine did not start within {:?}",
                self.start_timeout
            ))),
        }
    }

    async fn push_audio(&mut self, chunk: &[u8]) -> RelayResult<()> {
        self.client
            .publish_audio_frame(&self.section_id, chunk, SAMPLE_RATE, CHANNELS, self.sequence, false)
            .await
            .map_err(|e| RelayError::ProviderFailure(format!("{:#}", e)))?;

        self.sequence += 1;
        Ok(())
    }

    async fn stop(&mut self) -> RelayResult<()> {
        let result = self
            .client
            .publish_audio_frame(&self.section_id, &[], SAMPLE_RATE, CHANNELS, self.sequence, true)
            .await
            .map_err(|e| RelayError::ProviderFailure(format!("{:#}", e)));

        if let Err(e) = &result {
            error!("Failed to send final frame for section {}: {}", self.section_id, e);
        }

        if let Some(stopped) = self.stopped_rx.take() {
            if result.is_err() || timeout(self.stop_timeout, stopped).await.is_err() {
                warn!(
                    "Engine did not confirm stop for section {}, releasing subscription",
                    self.section_id
                );
                if let Some(listener) = self.listener.as_ref() {
                    listener.abort();
                }
            }
        }

        if let Some(listener) = self.listener.take() {
            if let Err(e) = listener.await {
                if !e.is_cancelled() {
                    error!("Translation listener panicked: {}", e);
                }
            }
        }

        result
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// Creates a `NatsProvider` per session over one shared connection
pub struct NatsProviderFactory {
    client: NatsClient,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl NatsProviderFactory {
    pub fn new(client: NatsClient, start_timeout: Duration, stop_timeout: Duration) -> Self {
        Self {
            client,
            start_timeout,
            stop_timeout,
        }
    }
}

#[async_trait]
impl ProviderFactory for NatsProviderFactory {
    async fn create(&self, spec: ProviderSpec) -> RelayResult<Box<dyn TranslationProvider>> {
        Ok(Box::new(NatsProvider::new(
            self.client.clone(),
            spec,
            self.start_timeout,
            self.stop_timeout,
        )))
    }
}
