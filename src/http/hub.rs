use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::orchestrator::{ClientEvent, EventPublisher};

/// Outbound queues of connected WebSocket clients
pub struct ConnectionHub {
    clients: RwLock<HashMap<String, mpsc::Sender<String>>>,
    max_send_queue: usize,
}

impl ConnectionHub {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            max_send_queue,
        }
    }

    /// Register a connection and return the receiver its writer task drains
    pub async fn register(&self, connection_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        self.clients.write().await.insert(connection_id.to_string(), tx);
        rx
    }

    pub async fn unregister(&self, connection_id: &str) {
        self.clients.write().await.remove(connection_id);
    }

    pub async fn count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Queue a text frame for one connection; drops it if the queue is full
    pub async fn send_to(&self, connection_id: &str, message: String) -> bool {
        let tx = match self.clients.read().await.get(connection_id) {
            Some(tx) => tx.clone(),
            None => return false,
        };

        match tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                warn!(
                    "Send queue full for connection {}, dropping {} byte message",
                    connection_id,
                    msg.len()
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

#[async_trait]
impl EventPublisher for ConnectionHub {
    async fn publish(&self, connection_id: &str, event: ClientEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => {
                self.send_to(connection_id, json).await;
            }
            Err(e) => warn!("Failed to serialize client event: {}", e),
        }
    }
}
