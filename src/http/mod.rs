//! HTTP and WebSocket front-end
//!
//! - GET /ws/voice - Voice relay socket (control as JSON text, audio as binary)
//! - GET /sections/:id - Persisted section
//! - GET /sections/:id/utterances - Transcript of a section
//! - GET /recordings/* - Finished WAV recordings
//! - GET /health - Health check

mod handlers;
mod hub;
mod routes;
mod state;
mod ws;

pub use hub::ConnectionHub;
pub use routes::create_router;
pub use state::AppState;
pub use ws::{ClientMessage, ServerMessage};
