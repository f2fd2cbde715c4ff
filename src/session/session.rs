use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex as StdMutex, MutexGuard};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::SessionState;
use super::stats::SessionStats;
use crate::audio::{CaptureFile, CaptureKind, CaptureSummary};
use crate::error::{RelayError, RelayResult};
use crate::provider::{ProviderEvent, TranslationProvider};

/// Transport-assigned connection identifier
pub type ConnectionId = String;

/// Identity and language settings of a session
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub connection_id: ConnectionId,
    /// Persisted section this session writes into
    pub section_id: Uuid,
    /// Parent session record of the section
    pub parent_session_id: Uuid,
    pub source_language: String,
    pub target_language: String,
    pub is_muted: bool,
}

/// The two sinks every ingested chunk goes to, guarded together
struct IngestPath {
    provider: Box<dyn TranslationProvider>,
    raw: CaptureFile,
}

/// Live per-connection translation run
///
/// Ingest (transport task) and event handling (session event loop) run
/// concurrently. The ingest path owns the provider and the raw capture under
/// one lock; the translated capture has its own lock and is written only by
/// the event loop.
pub struct Session {
    params: SessionParams,
    started_at: DateTime<Utc>,
    state: StdMutex<SessionState>,
    ingest: Mutex<Option<IngestPath>>,
    translated: Mutex<Option<CaptureFile>>,
    raw_path: PathBuf,
    translated_path: Option<PathBuf>,
    event_loop: StdMutex<Option<JoinHandle<()>>>,
    chunks_ingested: AtomicU64,
    bytes_ingested: AtomicU64,
    chunks_dropped: AtomicU64,
    utterances: AtomicU64,
    translated_bytes: AtomicU64,
}

impl Session {
    /// Open capture files and take ownership of an unstarted provider
    pub fn open(
        params: SessionParams,
        provider: Box<dyn TranslationProvider>,
        recordings_dir: &Path,
    ) -> RelayResult<Self> {
        let section = params.section_id.to_string();
        let raw = CaptureFile::create(recordings_dir, &section, CaptureKind::Original)?;
        let raw_path = raw.path().to_path_buf();

        let translated = if params.is_muted {
            None
        } else {
            match CaptureFile::create(recordings_dir, &section, CaptureKind::Translated) {
                Ok(capture) => Some(capture),
                Err(e) => {
                    drop(raw);
                    remove_quietly(&raw_path);
                    return Err(e.into());
                }
            }
        };
        let translated_path = translated.as_ref().map(|c| c.path().to_path_buf());

        info!(
            "Opened session for connection {} (section {}, {} -> {}, muted={}, provider={})",
            params.connection_id,
            params.section_id,
            params.source_language,
            params.target_language,
            params.is_muted,
            provider.name()
        );

        Ok(Self {
            params,
            started_at: Utc::now(),
            state: StdMutex::new(SessionState::Created),
            ingest: Mutex::new(Some(IngestPath { provider, raw })),
            translated: Mutex::new(translated),
            raw_path,
            translated_path,
            event_loop: StdMutex::new(None),
            chunks_ingested: AtomicU64::new(0),
            bytes_ingested: AtomicU64::new(0),
            chunks_dropped: AtomicU64::new(0),
            utterances: AtomicU64::new(0),
            translated_bytes: AtomicU64::new(0),
        })
    }

    pub fn connection_id(&self) -> &str {
        &self.params.connection_id
    }

    pub fn section_id(&self) -> Uuid {
        self.params.section_id
    }

    pub fn parent_session_id(&self) -> Uuid {
        self.params.parent_session_id
    }

    pub fn source_language(&self) -> &str {
        &self.params.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.params.target_language
    }

    pub fn is_muted(&self) -> bool {
        self.params.is_muted
    }

    pub fn state(&self) -> SessionState {
        *self.state_guard()
    }

    /// Raw capture location while the session is open
    pub fn raw_capture_path(&self) -> Option<&Path> {
        match self.state() {
            SessionState::Closed => None,
            _ => Some(&self.raw_path),
        }
    }

    /// Translated capture location while the session is open (never when muted)
    pub fn translated_capture_path(&self) -> Option<&Path> {
        match self.state() {
            SessionState::Closed => None,
            _ => self.translated_path.as_deref(),
        }
    }

    /// Start the provider and begin accepting audio
    ///
    /// Returns the provider's event receiver. Fails `InvalidState` unless the
    /// session is still `Created`.
    pub async fn activate(&self) -> RelayResult<mpsc::Receiver<ProviderEvent>> {
        let mut ingest = self.ingest.lock().await;

        let current = self.state();
        if current != SessionState::Created {
            return Err(RelayError::InvalidState(format!(
                "cannot start session in state {}",
                current
            )));
        }

        let path = ingest
            .as_mut()
            .ok_or_else(|| RelayError::InvalidState("session resources released".to_string()))?;
        let events = path.provider.start().await?;

        self.advance(&[SessionState::Created], SessionState::Active)?;
        info!("Session {} active", self.params.section_id);

        Ok(events)
    }

    /// Forward one chunk to the provider, then append it to the raw capture
    ///
    /// Returns `Ok(false)` when the chunk was dropped because the session is
    /// not active.
    pub async fn ingest(&self, chunk: &[u8]) -> RelayResult<bool> {
        if !self.state().accepts_audio() {
            self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }

        let mut ingest = self.ingest.lock().await;

        // Stop may have begun while waiting for the lock
        let path = match ingest.as_mut() {
            Some(path) if self.state().accepts_audio() => path,
            _ => {
                self.chunks_dropped.fetch_add(1, Ordering::Relaxed);
                return Ok(false);
            }
        };

        path.provider.push_audio(chunk).await?;
        path.raw.write(chunk)?;

        self.chunks_ingested.fetch_add(1, Ordering::Relaxed);
        self.bytes_ingested.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        Ok(true)
    }

    /// Enter `Stopping`, halt the provider and close the raw capture
    ///
    /// Provider stop failures are logged; the capture is closed regardless.
    pub async fn stop(&self) -> RelayResult<CaptureSummary> {
        self.advance(&[SessionState::Created, SessionState::Active], SessionState::Stopping)?;
        info!("Stopping session {}", self.params.section_id);

        let path = self
            .ingest
            .lock()
            .await
            .take()
            .ok_or_else(|| RelayError::InvalidState("session resources released".to_string()))?;

        let IngestPath { mut provider, raw } = path;

        if let Err(e) = provider.stop().await {
            warn!("Provider {} failed to stop cleanly: {}", provider.name(), e);
        }
        drop(provider);

        Ok(raw.finish()?)
    }

    /// Append synthesized audio to the translated capture
    ///
    /// Returns `Ok(false)` when there is no translated capture (muted or closed).
    pub async fn write_translated(&self, audio: &[u8]) -> RelayResult<bool> {
        let mut translated = self.translated.lock().await;
        match translated.as_mut() {
            Some(capture) => {
                capture.write(audio)?;
                self.translated_bytes.fetch_add(audio.len() as u64, Ordering::Relaxed);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close the translated capture, if one was opened
    pub async fn finish_translated(&self) -> RelayResult<Option<CaptureSummary>> {
        match self.translated.lock().await.take() {
            Some(capture) => Ok(Some(capture.finish()?)),
            None => Ok(None),
        }
    }

    /// Terminal transition after captures are encoded
    pub fn mark_closed(&self) {
        *self.state_guard() = SessionState::Closed;
        debug!("Session {} closed", self.params.section_id);
    }

    /// Release everything and delete the captures of a session that never
    /// became usable
    pub async fn discard(&self) {
        *self.state_guard() = SessionState::Closed;

        let path = self.ingest.lock().await.take();
        if let Some(IngestPath { mut provider, raw }) = path {
            if let Err(e) = provider.stop().await {
                debug!("Provider stop during discard: {}", e);
            }
            drop(raw);
        }
        remove_quietly(&self.raw_path);

        drop(self.translated.lock().await.take());
        if let Some(path) = &self.translated_path {
            remove_quietly(path);
        }

        if let Some(handle) = self.take_event_loop() {
            handle.abort();
        }
    }

    pub fn attach_event_loop(&self, handle: JoinHandle<()>) {
        let mut slot = self.event_loop.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(handle);
    }

    pub fn take_event_loop(&self) -> Option<JoinHandle<()>> {
        self.event_loop.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn record_utterance(&self) {
        self.utterances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            state: self.state().to_string(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_ingested: self.chunks_ingested.load(Ordering::Relaxed),
            bytes_ingested: self.bytes_ingested.load(Ordering::Relaxed),
            chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
            utterances: self.utterances.load(Ordering::Relaxed),
            translated_bytes: self.translated_bytes.load(Ordering::Relaxed),
        }
    }

    fn state_guard(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn advance(&self, from: &[SessionState], to: SessionState) -> RelayResult<()> {
        let mut state = self.state_guard();
        if !from.contains(&state) {
            return Err(RelayError::InvalidState(format!(
                "cannot move session from {} to {}",
                *state, to
            )));
        }
        *state = to;
        Ok(())
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove capture {}: {}", path.display(), e);
        }
    }
}
