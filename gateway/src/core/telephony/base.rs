//! Call control on the telephony provider.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::utils::retry::PolicyError;

#[derive(Debug, Clone, Error)]
pub enum TelephonyError {
    /// The control API could not be reached or answered with a server error.
    #[error("Telephony control unavailable: {0}")]
    ControlUnavailable(String),

    /// The provider refused the instruction, e.g. the call already ended.
    #[error("Telephony request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Telephony authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid telephony configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Telephony request timed out: {0}")]
    Timeout(String),
}

pub type TelephonyResult<T> = Result<T, TelephonyError>;

impl PolicyError for TelephonyError {
    fn timed_out(operation: &str, after: Duration) -> Self {
        TelephonyError::Timeout(format!("{operation} exceeded {}ms", after.as_millis()))
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            TelephonyError::ControlUnavailable(_) | TelephonyError::Timeout(_)
        )
    }
}

/// Out-of-band instructions for a live call.
#[async_trait]
pub trait TelephonyControl: Send + Sync {
    /// Play the audio at `stream_url` into the call once.
    async fn play_stream(&self, call_id: &str, stream_url: &str) -> TelephonyResult<()>;

    /// Terminate the call.
    async fn hangup(&self, call_id: &str) -> TelephonyResult<()>;
}
