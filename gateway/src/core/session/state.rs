//! Call session lifecycle.

use std::fmt;

use super::error::{SessionError, SessionResult};

/// `Created -> Active -> Ending -> Closed`; any live state may close directly.
/// `Ending` falls back to `Active` when the final reply could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Channel open, not yet bound to a call
    Created,
    /// Bound; audio, transcripts and replies flow
    Active,
    /// The dialogue engine ended the call; the last reply is being delivered
    Ending,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Created => "created",
            SessionState::Active => "active",
            SessionState::Ending => "ending",
            SessionState::Closed => "closed",
        }
    }

    /// Caller audio is relayed to recognition.
    pub fn accepts_audio(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Ending)
    }

    /// New transcripts start dialogue turns.
    pub fn accepts_transcripts(&self) -> bool {
        *self == SessionState::Active
    }

    pub fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }

    pub fn transition(self, next: SessionState) -> SessionResult<SessionState> {
        use SessionState::*;

        match (self, next) {
            (Created, Active)
            | (Active, Ending)
            | (Ending, Active)
            | (Created | Active | Ending, Closed) => Ok(next),
            (from, to) => Err(SessionError::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
