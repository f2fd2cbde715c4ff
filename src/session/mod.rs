//! Translation session management
//!
//! This module provides the per-connection `Session` and the
//! `SessionRegistry` that maps connections to sessions:
//! - Capture of both audio directions to raw files
//! - Forwarding of microphone audio to the translation engine
//! - Lifecycle state machine (created, active, stopping, closed)
//! - Session statistics

mod config;
mod registry;
mod session;
mod state;
mod stats;

pub use config::StartSessionRequest;
pub use registry::SessionRegistry;
pub use session::{ConnectionId, Session, SessionParams};
pub use state::SessionState;
pub use stats::SessionStats;
