use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a translation session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: String,

    /// When the session was opened
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of audio chunks accepted while active
    pub chunks_ingested: u64,

    /// Bytes written to the raw capture
    pub bytes_ingested: u64,

    /// Chunks discarded because the session was not active
    pub chunks_dropped: u64,

    /// Utterances persisted for this section
    pub utterances: u64,

    /// Bytes of synthesized audio captured
    pub translated_bytes: u64,
}
