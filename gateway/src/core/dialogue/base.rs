//! Dialogue engine abstraction.
//!
//! One call is one conversation: the engine hands back an opaque session
//! token with every reply and expects it on the next request.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use thiserror::Error;

use crate::utils::retry::PolicyError;

#[derive(Debug, Clone, Error)]
pub enum DialogueError {
    /// The engine could not be reached or answered with a server error.
    #[error("Dialogue engine unreachable: {0}")]
    DialogueUnreachable(String),

    /// The engine answered but reported a failure.
    #[error("Dialogue engine error ({status}): {message}")]
    EngineError { status: i64, message: String },

    #[error("Invalid dialogue engine response: {0}")]
    InvalidResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Dialogue request timed out: {0}")]
    Timeout(String),
}

pub type DialogueResult<T> = Result<T, DialogueError>;

impl PolicyError for DialogueError {
    fn timed_out(operation: &str, after: Duration) -> Self {
        DialogueError::Timeout(format!("{operation} exceeded {}ms", after.as_millis()))
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            DialogueError::DialogueUnreachable(_) | DialogueError::Timeout(_)
        )
    }
}

/// The engine's answer to one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DialogueReply {
    /// Reply text, possibly containing markup
    pub text: String,
    /// Token to send with the next request, if the engine issued one
    pub session_token: Option<String>,
    /// The engine asked for the call to be ended after this reply
    pub end_call: bool,
}

#[async_trait]
pub trait DialogueEngine: Send + Sync {
    /// Send one user utterance. `session_token` is `None` on the first turn.
    async fn send(&self, session_token: Option<&str>, text: &str)
    -> DialogueResult<DialogueReply>;
}

static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("markup pattern is valid"));

/// Reduce a reply to speakable text: tags are removed (their inner text is
/// kept) and the `||` segment separator is dropped.
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG
        .replace_all(text, "")
        .replace("||", "")
        .trim()
        .to_string()
}
