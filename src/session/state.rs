use std::fmt;

/// Lifecycle of a session
///
/// `Created → Active → Stopping → Closed`; each step is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Capture files open, engine built but not receiving audio
    Created,
    /// Engine started; audio is accepted
    Active,
    /// Engine halting; no audio accepted, pending results still delivered
    Stopping,
    /// Files closed and encoded, resources released
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
            SessionState::Closed => "closed",
        }
    }

    pub fn accepts_audio(&self) -> bool {
        matches!(self, SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
