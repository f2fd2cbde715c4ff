// Shared fixtures for orchestrator integration tests
//
// A scripted engine lets tests emit recognition/synthesis events on demand,
// and a recording publisher captures what would be pushed to clients.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;
use voice_relay::store::NewSection;
use voice_relay::{
    ClientEvent, EventPublisher, MemoryStore, Orchestrator, OrchestratorConfig, ProviderEvent,
    ProviderFactory, ProviderSpec, RelayError, RelayResult, Section, SectionStore,
    TranslationProvider, Utterance,
};

/// Test-side view of one engine instance
#[derive(Clone, Default)]
pub struct EngineHandle {
    events: Arc<Mutex<Option<mpsc::Sender<ProviderEvent>>>>,
    pushed: Arc<Mutex<Vec<Vec<u8>>>>,
    stopped: Arc<AtomicBool>,
    fail_push: Arc<AtomicBool>,
}

impl EngineHandle {
    /// Deliver an event as the engine would; false once the engine stopped
    pub async fn emit(&self, event: ProviderEvent) -> bool {
        let tx = self.events.lock().unwrap().clone();
        match tx {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    pub async fn recognize(&self, original: &str, language: &str, translated: &str) -> bool {
        let mut translations = HashMap::new();
        translations.insert(language.to_string(), translated.to_string());
        self.emit(ProviderEvent::Recognized {
            original: original.to_string(),
            translations,
        })
        .await
    }

    pub fn pushed_chunks(&self) -> Vec<Vec<u8>> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn pushed_bytes(&self) -> usize {
        self.pushed.lock().unwrap().iter().map(Vec::len).sum()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn fail_next_push(&self) {
        self.fail_push.store(true, Ordering::SeqCst);
    }
}

struct ScriptedProvider {
    handle: EngineHandle,
    cancel_on_start: bool,
}

#[async_trait]
impl TranslationProvider for ScriptedProvider {
    async fn start(&mut self) -> RelayResult<mpsc::Receiver<ProviderEvent>> {
        let (tx, rx) = mpsc::channel(64);
        if self.cancel_on_start {
            let _ = tx.try_send(ProviderEvent::Canceled {
                reason: "engine crashed on start".to_string(),
            });
        }
        *self.handle.events.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn push_audio(&mut self, chunk: &[u8]) -> RelayResult<()> {
        if self.handle.fail_push.load(Ordering::SeqCst) {
            return Err(RelayError::ProviderFailure("engine rejected audio".to_string()));
        }
        self.handle.pushed.lock().unwrap().push(chunk.to_vec());
        Ok(())
    }

    async fn stop(&mut self) -> RelayResult<()> {
        self.handle.stopped.store(true, Ordering::SeqCst);
        // Dropping the sender closes the channel once pending events drain
        self.handle.events.lock().unwrap().take();
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Provider that fails its handshake
struct BrokenProvider;

#[async_trait]
impl TranslationProvider for BrokenProvider {
    async fn start(&mut self) -> RelayResult<mpsc::Receiver<ProviderEvent>> {
        Err(RelayError::ProviderFailure("handshake refused".to_string()))
    }

    async fn push_audio(&mut self, _chunk: &[u8]) -> RelayResult<()> {
        Ok(())
    }

    async fn stop(&mut self) -> RelayResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "broken"
    }
}

#[derive(Default)]
pub struct ScriptedFactory {
    engines: Mutex<Vec<(ProviderSpec, EngineHandle)>>,
    fail_start: AtomicBool,
    cancel_on_start: AtomicBool,
    /// Recordings dir whose next translated capture lands on a full disk
    full_disk: Mutex<Option<PathBuf>>,
}

impl ScriptedFactory {
    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Engines queue a `Canceled` event before `start` returns
    pub fn cancel_on_start(&self, cancel: bool) {
        self.cancel_on_start.store(cancel, Ordering::SeqCst);
    }

    /// Point the next session's translated capture at `/dev/full`
    pub fn full_disk_for_translated(&self, recordings_dir: PathBuf) {
        *self.full_disk.lock().unwrap() = Some(recordings_dir);
    }

    /// Most recently created engine
    pub fn last_engine(&self) -> EngineHandle {
        self.engines
            .lock()
            .unwrap()
            .last()
            .map(|(_, handle)| handle.clone())
            .expect("no engine created")
    }

    pub fn last_spec(&self) -> ProviderSpec {
        self.engines
            .lock()
            .unwrap()
            .last()
            .map(|(spec, _)| spec.clone())
            .expect("no engine created")
    }

    pub fn created(&self) -> usize {
        self.engines.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderFactory for ScriptedFactory {
    async fn create(&self, spec: ProviderSpec) -> RelayResult<Box<dyn TranslationProvider>> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Ok(Box::new(BrokenProvider));
        }
        // Providers are created before capture files are opened
        let full_disk = self.full_disk.lock().unwrap().take();
        #[cfg(unix)]
        if let Some(dir) = full_disk {
            std::fs::create_dir_all(&dir).unwrap();
            let target = dir.join(format!("{}_translated.raw", spec.section_id));
            std::os::unix::fs::symlink("/dev/full", target).unwrap();
        }

        let handle = EngineHandle::default();
        self.engines.lock().unwrap().push((spec, handle.clone()));
        Ok(Box::new(ScriptedProvider {
            handle,
            cancel_on_start: self.cancel_on_start.load(Ordering::SeqCst),
        }))
    }
}

/// Publisher that remembers every pushed event
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(String, ClientEvent)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(String, ClientEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, connection_id: &str) -> Vec<ClientEvent> {
        self.events()
            .into_iter()
            .filter(|(c, _)| c == connection_id)
            .map(|(_, e)| e)
            .collect()
    }

    pub fn audio_events(&self) -> usize {
        self.events()
            .iter()
            .filter(|(_, e)| matches!(e, ClientEvent::ReceiveAudio { .. }))
            .count()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, connection_id: &str, event: ClientEvent) {
        self.events
            .lock()
            .unwrap()
            .push((connection_id.to_string(), event));
    }
}

/// In-memory store whose utterance writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl FlakyStore {
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn remove_section(&self, id: Uuid) -> Option<Section> {
        self.inner.remove_section(id).await
    }
}

#[async_trait]
impl SectionStore for FlakyStore {
    async fn create_section(&self, new: NewSection) -> RelayResult<Section> {
        self.inner.create_section(new).await
    }

    async fn save_utterance(
        &self,
        section_id: Uuid,
        original_text: &str,
        translated_text: &str,
    ) -> RelayResult<Utterance> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RelayError::Store("database unavailable".to_string()));
        }
        self.inner
            .save_utterance(section_id, original_text, translated_text)
            .await
    }

    async fn end_section(
        &self,
        section_id: Uuid,
        original_audio_path: Option<String>,
        translated_audio_path: Option<String>,
    ) -> RelayResult<bool> {
        self.inner
            .end_section(section_id, original_audio_path, translated_audio_path)
            .await
    }

    async fn section(&self, section_id: Uuid) -> RelayResult<Option<Section>> {
        self.inner.section(section_id).await
    }

    async fn utterances(&self, section_id: Uuid) -> RelayResult<Vec<Utterance>> {
        self.inner.utterances(section_id).await
    }
}

pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: Arc<FlakyStore>,
    pub engines: Arc<ScriptedFactory>,
    pub publisher: Arc<RecordingPublisher>,
    pub dir: TempDir,
}

pub fn harness() -> Harness {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(FlakyStore::default());
    let engines = Arc::new(ScriptedFactory::default());
    let publisher = Arc::new(RecordingPublisher::default());

    let mut config = OrchestratorConfig::new(dir.path().join("recordings"));
    config.drain_timeout = Duration::from_secs(2);

    let orchestrator = Orchestrator::new(store.clone(), engines.clone(), publisher.clone(), config);

    Harness {
        orchestrator,
        store,
        engines,
        publisher,
        dir,
    }
}

impl Harness {
    pub fn recordings(&self) -> std::path::PathBuf {
        self.dir.path().join("recordings")
    }

    /// Poll until the publisher has seen `count` events
    pub async fn wait_for_events(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.publisher.events().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Poll until no session is registered, or give up after two seconds
    pub async fn wait_until_idle(&self) -> bool {
        for _ in 0..200 {
            if self.orchestrator.active_sessions().await == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}
