pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod store;

pub use audio::{CaptureFile, CaptureKind, CaptureSummary, ContainerInfo};
pub use config::Config;
pub use error::{RelayError, RelayResult};
pub use http::{create_router, AppState, ConnectionHub};
pub use nats::{AudioFrameMessage, NatsClient, StartTranslationMessage, TranslationResultMessage};
pub use orchestrator::{ClientEvent, EndedSection, EventPublisher, Orchestrator, OrchestratorConfig};
pub use provider::{
    NatsProviderFactory, ProviderEvent, ProviderFactory, ProviderSpec, TranslationProvider,
};
pub use session::{Session, SessionRegistry, SessionState, SessionStats, StartSessionRequest};
pub use store::{MemoryStore, Section, SectionStore, Utterance};
