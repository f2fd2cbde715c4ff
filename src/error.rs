use std::path::PathBuf;

use uuid::Uuid;

/// Errors surfaced by the session orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The connection already owns an open session.
    #[error("connection {0} already has an active session")]
    AlreadyActive(String),

    /// The operation does not apply to the session's current phase.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// The persisted section no longer exists.
    #[error("section {0} not found")]
    NotFound(Uuid),

    /// The raw capture to encode is missing.
    #[error("raw capture not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The translation engine failed to start, accept audio, or stop.
    #[error("provider failure: {0}")]
    ProviderFailure(String),

    /// The connection carries no authenticated user.
    #[error("unauthorized")]
    Unauthorized,

    /// Writing or closing a capture file failed.
    #[error("capture i/o error: {0}")]
    Capture(#[from] std::io::Error),

    /// The persistence collaborator rejected a write.
    #[error("store error: {0}")]
    Store(String),
}

impl RelayError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::AlreadyActive(_) => "already_active",
            RelayError::InvalidState(_) => "invalid_state",
            RelayError::NotFound(_) => "not_found",
            RelayError::SourceNotFound(_) => "source_not_found",
            RelayError::ProviderFailure(_) => "provider_failure",
            RelayError::Unauthorized => "unauthorized",
            RelayError::Capture(_) => "capture_error",
            RelayError::Store(_) => "store_error",
        }
    }
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(RelayError::AlreadyActive("c1".into()).code(), "already_active");
        assert_eq!(RelayError::Unauthorized.code(), "unauthorized");
        assert_eq!(
            RelayError::SourceNotFound(PathBuf::from("/tmp/x.raw")).code(),
            "source_not_found"
        );
    }

    #[test]
    fn test_io_error_converts_to_capture() {
        let err: RelayError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(matches!(err, RelayError::Capture(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
