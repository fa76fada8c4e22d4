//! Getting one reply's audio to the caller.

use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::events::{DeliveryOutcome, OutboundFrame};
use super::settings::{CallServices, DeliveryMode, SessionSettings};
use crate::core::audio::frame_audio;
use crate::core::tts::SynthesisRequest;

/// Everything a delivery task needs, detached from the session.
pub(crate) struct ReplyDelivery {
    pub call_id: String,
    pub text: String,
    pub language_code: String,
    pub sample_rate: u32,
    /// Outbound frame size negotiated for this call
    pub frame_size: NonZeroUsize,
    pub services: CallServices,
    pub settings: Arc<SessionSettings>,
    pub outbound: mpsc::Sender<OutboundFrame>,
    pub cancel: CancellationToken,
}

impl ReplyDelivery {
    /// Synthesize and deliver. Every side effect is preceded by a liveness
    /// check, so nothing is written or requested for a closed session.
    pub async fn run(self) -> DeliveryOutcome {
        if self.text.is_empty() {
            return DeliveryOutcome::Skipped;
        }

        let request = SynthesisRequest {
            text: self.text.clone(),
            language_code: self.language_code.clone(),
            voice: self.settings.voice.clone(),
            encoding: self.settings.encoding_profile(self.sample_rate),
        };

        let synthesizer = self.services.synthesizer.clone();
        let audio = match self
            .settings
            .call_policy
            .run("synthesis.synthesize", || synthesizer.synthesize(&request))
            .await
        {
            Ok(audio) => audio,
            Err(e) => {
                error!(call_id = %self.call_id, "Speech synthesis failed, reply dropped: {}", e);
                return DeliveryOutcome::Failed;
            }
        };

        if self.cancel.is_cancelled() {
            return DeliveryOutcome::Interrupted;
        }

        match self.settings.delivery_mode {
            DeliveryMode::Stream => self.stream(audio).await,
            DeliveryMode::File => self.play_file(audio).await,
        }
    }

    async fn stream(&self, audio: bytes::Bytes) -> DeliveryOutcome {
        let frames = frame_audio(&audio, self.frame_size);
        let count = frames.len();

        for frame in frames {
            if self.cancel.is_cancelled() {
                return DeliveryOutcome::Interrupted;
            }
            if self.outbound.send(OutboundFrame::Audio(frame)).await.is_err() {
                warn!(call_id = %self.call_id, "Call socket writer gone mid-reply");
                return DeliveryOutcome::Interrupted;
            }
        }

        // Wait until the writer has put every frame on the wire.
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.outbound.send(OutboundFrame::Flush(ack_tx)).await.is_err() {
            return DeliveryOutcome::Interrupted;
        }
        if ack_rx.await.is_err() {
            return DeliveryOutcome::Interrupted;
        }

        debug!(call_id = %self.call_id, frames = count, "Reply streamed");
        DeliveryOutcome::Streamed { frames: count }
    }

    async fn play_file(&self, audio: bytes::Bytes) -> DeliveryOutcome {
        let file_name = match self.services.audio_store.store(&self.call_id, &audio).await {
            Ok(file_name) => file_name,
            Err(e) => {
                error!(call_id = %self.call_id, "Failed to write reply audio: {}", e);
                return DeliveryOutcome::Failed;
            }
        };

        if self.cancel.is_cancelled() {
            return DeliveryOutcome::Interrupted;
        }

        let url = self.settings.audio_url(&file_name);
        let telephony = self.services.telephony.clone();
        match self
            .settings
            .call_policy
            .run("telephony.play_stream", || {
                telephony.play_stream(&self.call_id, &url)
            })
            .await
        {
            Ok(()) => {
                info!(call_id = %self.call_id, url = %url, "Reply playback requested");
                DeliveryOutcome::PlaybackStarted
            }
            Err(e) => {
                error!(call_id = %self.call_id, "Playback request failed: {}", e);
                DeliveryOutcome::Failed
            }
        }
    }
}
