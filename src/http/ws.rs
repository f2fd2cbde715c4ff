use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::state::AppState;
use crate::error::RelayError;
use crate::session::StartSessionRequest;

// ============================================================================
// Protocol
// ============================================================================

/// Control message sent by the client as a text frame
///
/// Binary frames carry PCM audio and are not wrapped.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    StartSession(StartSessionRequest),
    EndSession,
}

/// Reply to a control message
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    SessionStarted { section_id: Uuid },
    #[serde(rename_all = "camelCase")]
    SessionEnded {
        section_id: Option<Uuid>,
        original_audio_path: Option<PathBuf>,
        translated_audio_path: Option<PathBuf>,
    },
    Error { code: String, message: String },
}

impl From<&RelayError> for ServerMessage {
    fn from(e: &RelayError) -> Self {
        ServerMessage::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub access_token: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /ws/voice
/// Upgrade to the voice relay socket
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let token = params.access_token.or(bearer);
    let user_id = state.user_for(token.as_deref());

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Option<String>) {
    let connection_id = Uuid::new_v4().to_string();
    info!(
        "Connection {} opened (user: {})",
        connection_id,
        user_id.as_deref().unwrap_or("anonymous")
    );

    let mut outbound = state.hub.register(&connection_id).await;
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Binary(chunk)) => {
                state.orchestrator.ingest_audio(&connection_id, &chunk).await;
            }
            Ok(Message::Text(text)) => {
                handle_control(&state, &connection_id, user_id.as_deref(), &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Connection {} errored: {}", connection_id, e);
                break;
            }
        }
    }

    // Disconnect is the one teardown notification for this connection
    if let Err(e) = state.orchestrator.end_session(&connection_id).await {
        error!("Teardown on disconnect failed for {}: {}", connection_id, e);
    }

    state.hub.unregister(&connection_id).await;
    writer.abort();
    info!("Connection {} closed", connection_id);
}

async fn handle_control(state: &AppState, connection_id: &str, user_id: Option<&str>, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            debug!("Unparseable control message on {}: {}", connection_id, e);
            reply(
                state,
                connection_id,
                &ServerMessage::Error {
                    code: "bad_request".to_string(),
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    let response = match message {
        ClientMessage::StartSession(request) => {
            match state.orchestrator.start_session(connection_id, user_id, request).await {
                Ok(section_id) => ServerMessage::SessionStarted { section_id },
                Err(e) => ServerMessage::from(&e),
            }
        }
        ClientMessage::EndSession => match state.orchestrator.end_session(connection_id).await {
            Ok(ended) => ServerMessage::SessionEnded {
                section_id: ended.as_ref().map(|e| e.section_id),
                original_audio_path: ended.as_ref().and_then(|e| e.original_audio_path.clone()),
                translated_audio_path: ended.and_then(|e| e.translated_audio_path),
            },
            Err(e) => ServerMessage::from(&e),
        },
    };

    reply(state, connection_id, &response).await;
}

async fn reply(state: &AppState, connection_id: &str, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(json) => {
            state.hub.send_to(connection_id, json).await;
        }
        Err(e) => error!("Failed to serialize reply: {}", e),
    }
}
