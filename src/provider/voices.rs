/// Voice used when the target language has no dedicated entry
pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";

const VOICES: &[(&str, &str)] = &[
    ("tr-TR", "tr-TR-EmelNeural"),
    ("en-US", "en-US-JennyNeural"),
    ("en-GB", "en-GB-SoniaNeural"),
    ("de-DE", "de-DE-KatjaNeural"),
    ("fr-FR", "fr-FR-DeniseNeural"),
    ("es-ES", "es-ES-ElviraNeural"),
    ("ru-RU", "ru-RU-SvetlanaNeural"),
    ("it-IT", "it-IT-ElsaNeural"),
];

/// Synthesis voice for a target language tag
pub fn voice_for(language: &str) -> &'static str {
    VOICES
        .iter()
        .find(|(tag, _)| *tag == language)
        .map(|(_, voice)| *voice)
        .unwrap_or(DEFAULT_VOICE)
}
