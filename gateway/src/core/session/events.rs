//! Events consumed and produced by a call session.

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::core::dialogue::{DialogueReply, DialogueResult};
use crate::core::stt::Transcript;

/// Frames read from the call socket. The socket closing is signalled by the
/// inbound sender being dropped.
#[derive(Debug)]
pub enum InboundEvent {
    /// A text frame; the first valid one binds the session
    Control(String),
    /// Caller audio, 16-bit linear PCM
    Audio(Bytes),
}

/// Writes to the call socket, drained in order by a single writer.
#[derive(Debug)]
pub enum OutboundFrame {
    Audio(Bytes),
    /// Empty text frame that keeps the provider from timing the socket out
    KeepAlive,
    /// Acknowledged once every frame queued before it has been written
    Flush(oneshot::Sender<()>),
}

/// How a reply's audio left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every frame was written to the socket
    Streamed { frames: usize },
    /// The provider acknowledged the playback request
    PlaybackStarted,
    /// Nothing to say
    Skipped,
    /// Synthesis, storage or the playback request failed
    Failed,
    /// The session or the socket went away mid-delivery
    Interrupted,
}

/// Completions fed back into the session loop from its own tasks.
#[derive(Debug)]
pub(crate) enum InternalEvent {
    Transcript(Transcript),
    DialogueReply {
        turn: u64,
        result: DialogueResult<DialogueReply>,
    },
    TurnDelivered {
        turn: u64,
        outcome: DeliveryOutcome,
    },
    /// The recognition stream opened as `generation` stopped on its own
    RecognitionLost { generation: u64 },
}
