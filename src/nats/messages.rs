use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Audio frame message published to NATS
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub section_id: String,
    pub sequence: u32,
    pub pcm: String,  // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String,  // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Asks the translation worker to open a recognizer for a section
#[derive(Debug, Serialize, Deserialize)]
pub struct StartTranslationMessage {
    pub section_id: String,
    pub source_language: String,
    pub target_language: String,
    pub voice: String,
    pub sample_rate: u32,
    pub timestamp: String,
}

/// Worker's answer to a start request
#[derive(Debug, Serialize, Deserialize)]
pub struct StartReplyMessage {
    pub accepted: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl StartReplyMessage {
    /// `Err` with the worker's reason when the recognizer was refused
    pub fn into_result(self) -> Result<(), String> {
        if self.accepted {
            Ok(())
        } else {
            Err(self.reason.unwrap_or_else(|| "no reason given".to_string()))
        }
    }
}

/// Result published by the translation worker for one section
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranslationResultMessage {
    /// A finalized utterance with its translations keyed by language tag
    Recognized {
        original_text: String,
        translations: HashMap<String, String>,
    },
    /// One fragment of synthesized target-language audio
    Synthesizing {
        audio: String,  // Base64-encoded PCM bytes
    },
    /// The recognizer failed and will not produce further results
    Canceled { reason: String },
    /// The recognizer drained after the final frame
    Stopped,
}
