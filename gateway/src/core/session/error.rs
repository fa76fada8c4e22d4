use thiserror::Error;

use super::state::SessionState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The first text message on a call socket could not be used to bind it.
    #[error("Malformed control message: {0}")]
    MalformedControlMessage(String),

    #[error("Call channel closed")]
    ChannelClosed,

    #[error("Call {0} already has an active session")]
    DuplicateCall(String),

    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;
