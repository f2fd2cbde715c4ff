//! Session orchestration
//!
//! Entry points used by the transport:
//! - `start_session` persists a section, starts the engine and registers the session
//! - `ingest_audio` forwards a chunk (fire and forget)
//! - `end_session` tears the session down, encodes captures and closes the section

mod events;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::audio::wav;
use crate::error::{RelayError, RelayResult};
use crate::provider::{ProviderFactory, ProviderSpec};
use crate::session::{Session, SessionParams, SessionRegistry, SessionStats, StartSessionRequest};
use crate::store::{NewSection, Section, SectionStore};

pub use events::{ClientEvent, EventPublisher};

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Directory holding raw captures and finished recordings
    pub recordings_dir: PathBuf,
    /// Upper bound on waiting for a stopped engine's last events
    pub drain_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            drain_timeout: Duration::from_secs(10),
        }
    }
}

/// Result of a completed teardown
#[derive(Debug, Clone)]
pub struct EndedSection {
    pub section_id: Uuid,
    pub original_audio_path: Option<PathBuf>,
    pub translated_audio_path: Option<PathBuf>,
    pub stats: SessionStats,
}

struct Inner {
    registry: SessionRegistry,
    store: Arc<dyn SectionStore>,
    providers: Arc<dyn ProviderFactory>,
    publisher: Arc<dyn EventPublisher>,
    config: OrchestratorConfig,
}

/// Owns every active session of the process
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SectionStore>,
        providers: Arc<dyn ProviderFactory>,
        publisher: Arc<dyn EventPublisher>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: SessionRegistry::new(),
                store,
                providers,
                publisher,
                config,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Start translating on a connection
    ///
    /// Returns the id of the new section.
    pub async fn start_session(
        &self,
        connection_id: &str,
        user_id: Option<&str>,
        request: StartSessionRequest,
    ) -> RelayResult<Uuid> {
        let user_id = user_id.ok_or(RelayError::Unauthorized)?;

        if self.inner.registry.contains(connection_id).await {
            return Err(RelayError::AlreadyActive(connection_id.to_string()));
        }

        let section = self
            .inner
            .store
            .create_section(NewSection {
                user_id: user_id.to_string(),
                session_id: request.session_id,
                source_language: request.source_language.clone(),
                target_language: request.target_language.clone(),
                is_muted: request.is_muted,
            })
            .await?;

        match self.open_session(connection_id, &section).await {
            Ok(()) => {
                info!(
                    "Session started on connection {} (section {})",
                    connection_id, section.id
                );
                Ok(section.id)
            }
            Err(e) => {
                error!("Failed to start session on connection {}: {}", connection_id, e);
                if let Err(close_err) = self.inner.store.end_section(section.id, None, None).await {
                    warn!("Failed to close unused section {}: {}", section.id, close_err);
                }
                Err(e)
            }
        }
    }

    async fn open_session(&self, connection_id: &str, section: &Section) -> RelayResult<()> {
        let provider = self
            .inner
            .providers
            .create(ProviderSpec::new(
                section.id,
                &section.source_language,
                &section.target_language,
            ))
            .await?;

        let params = SessionParams {
            connection_id: connection_id.to_string(),
            section_id: section.id,
            parent_session_id: section.session_id,
            source_language: section.source_language.clone(),
            target_language: section.target_language.clone(),
            is_muted: section.is_muted,
        };
        let session = Arc::new(Session::open(
            params,
            provider,
            &self.inner.config.recordings_dir,
        )?);

        let events = match session.activate().await {
            Ok(events) => events,
            Err(e) => {
                session.discard().await;
                return Err(e);
            }
        };

        // Registered before the loop runs so an early engine cancel finds it
        if let Err(e) = self.inner.registry.insert(connection_id, Arc::clone(&session)).await {
            warn!("Lost start race on connection {}, discarding section {}", connection_id, section.id);
            session.discard().await;
            return Err(e);
        }

        let event_loop = tokio::spawn(self.clone().run_event_loop(Arc::clone(&session), events));
        session.attach_event_loop(event_loop);

        Ok(())
    }

    /// Forward one chunk of microphone audio
    ///
    /// Chunks for unknown or stopping sessions are discarded. A failing
    /// capture or engine tears the session down.
    pub async fn ingest_audio(&self, connection_id: &str, chunk: &[u8]) {
        let session = match self.inner.registry.get(connection_id).await {
            Some(session) => session,
            None => {
                debug!("Discarding {} bytes for connection {} without session", chunk.len(), connection_id);
                return;
            }
        };

        if let Err(e) = session.ingest(chunk).await {
            error!(
                "Ingest failed for section {}, ending session: {}",
                session.section_id(),
                e
            );
            if let Err(e) = self.end_section_of(connection_id, session.section_id()).await {
                error!("Teardown after ingest failure failed: {}", e);
            }
        }
    }

    /// Tear down the connection's session
    ///
    /// Returns `Ok(None)` when there is nothing to end, so calling it from
    /// both an explicit stop and the disconnect handler is safe.
    pub async fn end_session(&self, connection_id: &str) -> RelayResult<Option<EndedSection>> {
        match self.inner.registry.remove(connection_id).await {
            Some(session) => self.teardown(session).await.map(Some),
            None => Ok(None),
        }
    }

    /// Like `end_session`, but only if the connection still runs `section_id`
    async fn end_section_of(&self, connection_id: &str, section_id: Uuid) -> RelayResult<Option<EndedSection>> {
        match self.inner.registry.remove_section(connection_id, section_id).await {
            Some(session) => self.teardown(session).await.map(Some),
            None => Ok(None),
        }
    }

    async fn teardown(&self, session: Arc<Session>) -> RelayResult<EndedSection> {
        let section_id = session.section_id();
        info!("Ending session for connection {} (section {})", session.connection_id(), section_id);

        let raw = match session.stop().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                error!("Failed to close raw capture for section {}: {}", section_id, e);
                None
            }
        };

        if let Some(event_loop) = session.take_event_loop() {
            let abort = event_loop.abort_handle();
            match timeout(self.inner.config.drain_timeout, event_loop).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Event loop for section {} panicked: {}", section_id, e),
                Err(_) => {
                    warn!(
                        "Engine events for section {} did not drain within {:?}",
                        section_id, self.inner.config.drain_timeout
                    );
                    abort.abort();
                }
            }
        }

        let translated = match session.finish_translated().await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Failed to close translated capture for section {}: {}", section_id, e);
                None
            }
        };

        let original_audio_path = match raw {
            Some(summary) => encode_capture(&summary.path).await,
            None => None,
        };
        let translated_audio_path = match translated {
            Some(summary) => encode_capture(&summary.path).await,
            None => None,
        };

        session.mark_closed();
        let stats = session.stats();

        self.inner
            .store
            .end_section(
                section_id,
                original_audio_path.as_ref().map(|p| p.display().to_string()),
                translated_audio_path.as_ref().map(|p| p.display().to_string()),
            )
            .await?;

        info!(
            "Session ended (section {}): {} chunks, {} bytes, {} utterances",
            section_id, stats.chunks_ingested, stats.bytes_ingested, stats.utterances
        );

        Ok(EndedSection {
            section_id,
            original_audio_path,
            translated_audio_path,
            stats,
        })
    }

    /// End every active session
    pub async fn shutdown(&self) {
        let connections = self.inner.registry.connection_ids().await;
        info!("Shutting down {} active sessions", connections.len());

        for connection_id in connections {
            if let Err(e) = self.end_session(&connection_id).await {
                error!("Failed to end session for connection {}: {}", connection_id, e);
            }
        }
    }

    pub async fn active_sessions(&self) -> usize {
        self.inner.registry.len().await
    }

    pub async fn session_stats(&self, connection_id: &str) -> Option<SessionStats> {
        self.inner
            .registry
            .get(connection_id)
            .await
            .map(|session| session.stats())
    }
}

/// Encode a closed capture off the async runtime; failures are logged
async fn encode_capture(raw_path: &Path) -> Option<PathBuf> {
    let path = raw_path.to_path_buf();

    match tokio::task::spawn_blocking(move || wav::encode(&path)).await {
        Ok(Ok(wav_path)) => {
            match wav::inspect(&wav_path) {
                Ok(info) => debug!(
                    "Recording {}: {:.1}s, {}Hz, {} channel(s)",
                    wav_path.display(),
                    info.duration_seconds,
                    info.sample_rate,
                    info.channels
                ),
                Err(e) => warn!("Encoded recording {} is unreadable: {}", wav_path.display(), e),
            }
            Some(wav_path)
        }
        Ok(Err(e)) => {
            error!("Failed to encode {}: {}", raw_path.display(), e);
            None
        }
        Err(e) => {
            error!("Encoder task for {} panicked: {}", raw_path.display(), e);
            None
        }
    }
}
