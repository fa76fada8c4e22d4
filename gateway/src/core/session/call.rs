//! One phone call, driven by a single event loop.
//!
//! The loop owns all per-call state. External calls run in spawned tasks that
//! report back through an internal queue, so the loop never waits on a
//! provider while audio is arriving.

use bytes::Bytes;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::control::ControlMessage;
use super::delivery::ReplyDelivery;
use super::events::{DeliveryOutcome, InboundEvent, InternalEvent, OutboundFrame};
use super::registry::{SessionHandle, SessionRegistry};
use super::settings::{CallServices, DeliveryMode, SessionSettings};
use super::state::SessionState;
use crate::core::dialogue::{DialogueReply, DialogueResult, strip_markup};
use crate::core::stt::{RecognitionBridge, RecognitionConfig, Transcript, TranscriptCallback};

const INTERNAL_QUEUE_CAPACITY: usize = 64;

/// Recognition streams reopened per call before caller audio is given up on.
const MAX_RECOGNITION_REOPENS: u32 = 3;

enum Step {
    Inbound(Option<InboundEvent>),
    Internal(InternalEvent),
    KeepAlive,
}

/// Per-call state. Created for every new call socket.
pub struct CallSession {
    connection_id: Uuid,
    state: SessionState,
    state_tx: watch::Sender<SessionState>,

    call_id: Option<String>,
    language_code: String,
    sample_rate: u32,
    dialogue_token: Option<String>,
    end_requested: bool,

    bridge: Option<RecognitionBridge>,
    recognition_generation: u64,
    recognition_reopens: u32,
    pending: VecDeque<Transcript>,
    turn_in_flight: Option<u64>,
    next_turn: u64,
    hangup_issued: bool,
    released: bool,

    services: CallServices,
    settings: Arc<SessionSettings>,
    registry: Arc<SessionRegistry>,
    outbound: mpsc::Sender<OutboundFrame>,
    internal_tx: mpsc::Sender<InternalEvent>,
    internal_rx: Option<mpsc::Receiver<InternalEvent>>,
    cancel: CancellationToken,
}

impl CallSession {
    pub fn new(
        services: CallServices,
        settings: Arc<SessionSettings>,
        registry: Arc<SessionRegistry>,
        outbound: mpsc::Sender<OutboundFrame>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Created);
        let (internal_tx, internal_rx) = mpsc::channel(INTERNAL_QUEUE_CAPACITY);

        Self {
            connection_id: Uuid::new_v4(),
            state: SessionState::Created,
            state_tx,
            call_id: None,
            language_code: settings.language_code.clone(),
            sample_rate: settings.sample_rate,
            dialogue_token: None,
            end_requested: false,
            bridge: None,
            recognition_generation: 0,
            recognition_reopens: 0,
            pending: VecDeque::new(),
            turn_in_flight: None,
            next_turn: 0,
            hangup_issued: false,
            released: false,
            services,
            settings,
            registry,
            outbound,
            internal_tx,
            internal_rx: Some(internal_rx),
            cancel: CancellationToken::new(),
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Follow state changes from outside the session task.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Drive the session until the socket closes or the call is hung up.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<InboundEvent>) {
        let Some(mut internal_rx) = self.internal_rx.take() else {
            error!(connection_id = %self.connection_id, "Session started twice");
            return;
        };
        let mut keep_alive: Option<Interval> = None;

        debug!(connection_id = %self.connection_id, "Call session opened");

        loop {
            let step = tokio::select! {
                event = inbound.recv() => Step::Inbound(event),
                Some(event) = internal_rx.recv() => Step::Internal(event),
                _ = tick(&mut keep_alive) => Step::KeepAlive,
            };

            match step {
                Step::Inbound(Some(InboundEvent::Control(text))) => {
                    self.handle_control(&text).await;
                    if keep_alive.is_none() && self.state.accepts_audio() {
                        keep_alive = Some(keep_alive_timer(self.settings.keep_alive_interval));
                    }
                }
                Step::Inbound(Some(InboundEvent::Audio(frame))) => self.handle_audio(frame).await,
                Step::Inbound(None) => {
                    info!(
                        connection_id = %self.connection_id,
                        call_id = self.call_id.as_deref().unwrap_or("-"),
                        "Call socket closed"
                    );
                    break;
                }
                Step::Internal(event) => {
                    self.handle_internal(event).await;
                    if self.state.is_closed() {
                        break;
                    }
                }
                Step::KeepAlive => self.send_keep_alive(),
            }
        }

        drop(keep_alive);
        self.close();
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    async fn handle_control(&mut self, text: &str) {
        if let Some(call_id) = &self.call_id {
            debug!(call_id = %call_id, "Ignoring text frame on bound session");
            return;
        }

        let message = match ControlMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(connection_id = %self.connection_id, "{}", e);
                return;
            }
        };

        let call_id = message.call_id().to_string();
        let handle = SessionHandle::new(
            self.connection_id,
            self.state_tx.subscribe(),
            self.cancel.clone(),
        );
        if let Err(e) = self.registry.register(&call_id, handle) {
            warn!(connection_id = %self.connection_id, "Refusing to bind session: {}", e);
            return;
        }

        if let Some(language) = message.language() {
            self.language_code = language.to_string();
        }
        if let Some(sample_rate) = message.sample_rate() {
            self.sample_rate = sample_rate;
        }
        self.call_id = Some(call_id.clone());
        self.set_state(SessionState::Active);

        info!(
            call_id = %call_id,
            language = %self.language_code,
            sample_rate = self.sample_rate,
            delivery = %self.settings.delivery_mode,
            "Call session bound"
        );

        self.start_recognition().await;
    }

    async fn start_recognition(&mut self) {
        let internal_tx = self.internal_tx.clone();
        let on_transcript: TranscriptCallback = Arc::new(
            move |transcript: Transcript| -> Pin<Box<dyn Future<Output = ()> + Send>> {
                let internal_tx = internal_tx.clone();
                Box::pin(async move {
                    let _ = internal_tx.send(InternalEvent::Transcript(transcript)).await;
                })
            },
        );

        self.recognition_generation += 1;
        let generation = self.recognition_generation;

        let config = RecognitionConfig::linear16(self.language_code.clone(), self.sample_rate);
        match RecognitionBridge::start(
            self.services.recognizer.as_ref(),
            &config,
            &self.settings.call_policy,
            on_transcript,
        )
        .await
        {
            Ok(bridge) => {
                self.watch_recognition(&bridge, generation);
                self.bridge = Some(bridge);
            }
            Err(e) => error!(
                call_id = self.call_id.as_deref().unwrap_or("-"),
                "Speech recognition unavailable, caller audio will be ignored: {}", e
            ),
        }
    }

    /// Report the bridge's end back to the loop unless the session closes first.
    fn watch_recognition(&self, bridge: &RecognitionBridge, generation: u64) {
        let ended = bridge.end_signal();
        let internal_tx = self.internal_tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = ended.cancelled() => {
                    let _ = internal_tx
                        .send(InternalEvent::RecognitionLost { generation })
                        .await;
                }
            }
        });
    }

    /// Replace a recognition stream the provider ended, a bounded number of times.
    async fn handle_recognition_lost(&mut self, generation: u64) {
        if generation != self.recognition_generation || !self.state.accepts_audio() {
            return;
        }
        if let Some(mut bridge) = self.bridge.take() {
            bridge.close();
        }

        let call_id = self.call_id.clone().unwrap_or_default();
        if self.recognition_reopens >= MAX_RECOGNITION_REOPENS {
            error!(
                call_id = %call_id,
                reopens = self.recognition_reopens,
                "Recognition stream lost again, caller audio will be ignored"
            );
            return;
        }
        self.recognition_reopens += 1;
        warn!(
            call_id = %call_id,
            reopen = self.recognition_reopens,
            "Recognition stream lost, reopening"
        );
        self.start_recognition().await;
    }

    async fn handle_audio(&mut self, frame: Bytes) {
        if !self.state.accepts_audio() {
            debug!(
                connection_id = %self.connection_id,
                "Dropping {} bytes of audio received before binding",
                frame.len()
            );
            return;
        }
        let Some(bridge) = self.bridge.as_mut() else {
            return;
        };
        if !bridge.push_audio(frame) && !bridge.is_open() {
            let generation = self.recognition_generation;
            self.handle_recognition_lost(generation).await;
        }
    }

    fn send_keep_alive(&self) {
        if self.outbound.try_send(OutboundFrame::KeepAlive).is_err() {
            debug!(connection_id = %self.connection_id, "Outbound queue busy, skipping keep-alive");
        }
    }

    // =========================================================================
    // Turns
    // =========================================================================

    async fn handle_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::Transcript(transcript) => {
                if !self.state.accepts_transcripts() {
                    debug!(state = %self.state, "Ignoring transcript");
                    return;
                }
                info!(
                    call_id = self.call_id.as_deref().unwrap_or("-"),
                    confidence = transcript.confidence,
                    "Caller: {}", transcript.text
                );
                self.pending.push_back(transcript);
                self.start_next_turn();
            }
            InternalEvent::DialogueReply { turn, result } => {
                self.handle_dialogue_reply(turn, result).await;
            }
            InternalEvent::TurnDelivered { turn, outcome } => {
                self.handle_turn_delivered(turn, outcome).await;
            }
            InternalEvent::RecognitionLost { generation } => {
                self.handle_recognition_lost(generation).await;
            }
        }
    }

    /// Start the next queued transcript if no turn is in flight.
    fn start_next_turn(&mut self) {
        if self.turn_in_flight.is_some() || !self.state.accepts_transcripts() {
            return;
        }
        let Some(transcript) = self.pending.pop_front() else {
            return;
        };

        let turn = self.next_turn;
        self.next_turn += 1;
        self.turn_in_flight = Some(turn);

        let dialogue = self.services.dialogue.clone();
        let token = self.dialogue_token.clone();
        let policy = self.settings.call_policy.clone();
        let internal_tx = self.internal_tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let result = policy
                .run("dialogue.send", || {
                    dialogue.send(token.as_deref(), &transcript.text)
                })
                .await;
            if cancel.is_cancelled() {
                debug!("Session closed during dialogue call, discarding reply");
                return;
            }
            let _ = internal_tx
                .send(InternalEvent::DialogueReply { turn, result })
                .await;
        });
    }

    async fn handle_dialogue_reply(&mut self, turn: u64, result: DialogueResult<DialogueReply>) {
        if self.turn_in_flight != Some(turn) {
            warn!(turn, "Discarding reply for a turn that is no longer current");
            return;
        }
        let call_id = self.call_id.clone().unwrap_or_default();

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                error!(call_id = %call_id, "Dialogue engine failed, skipping turn: {}", e);
                self.turn_in_flight = None;
                self.start_next_turn();
                return;
            }
        };

        if let Some(token) = reply.session_token {
            self.dialogue_token = Some(token);
        }

        let text = strip_markup(&reply.text);
        info!(call_id = %call_id, end_call = reply.end_call, "Bot: {}", text);

        if reply.end_call && !self.end_requested {
            self.end_requested = true;
            self.set_state(SessionState::Ending);
            if !self.pending.is_empty() {
                debug!(dropped = self.pending.len(), "Dropping transcripts queued behind the final reply");
                self.pending.clear();
            }
        }

        let delivery = ReplyDelivery {
            call_id,
            text,
            language_code: self.language_code.clone(),
            sample_rate: self.sample_rate,
            frame_size: self.settings.frame_size_for(self.sample_rate),
            services: self.services.clone(),
            settings: self.settings.clone(),
            outbound: self.outbound.clone(),
            cancel: self.cancel.clone(),
        };
        let internal_tx = self.internal_tx.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let outcome = delivery.run().await;
            if cancel.is_cancelled() {
                return;
            }
            let _ = internal_tx
                .send(InternalEvent::TurnDelivered { turn, outcome })
                .await;
        });
    }

    async fn handle_turn_delivered(&mut self, turn: u64, outcome: DeliveryOutcome) {
        if self.turn_in_flight != Some(turn) {
            return;
        }
        self.turn_in_flight = None;
        debug!(turn, ?outcome, "Turn complete");

        if !self.end_requested {
            self.start_next_turn();
            return;
        }

        // The hangup must not overtake the final reply's audio or playback request.
        match outcome {
            DeliveryOutcome::Failed => {
                warn!(
                    call_id = self.call_id.as_deref().unwrap_or("-"),
                    "Final reply not delivered, resuming the conversation"
                );
                self.end_requested = false;
                self.set_state(SessionState::Active);
                self.start_next_turn();
            }
            DeliveryOutcome::Interrupted => {
                debug!("Final reply interrupted, not hanging up");
            }
            DeliveryOutcome::Streamed { .. }
            | DeliveryOutcome::PlaybackStarted
            | DeliveryOutcome::Skipped => {
                self.hang_up().await;
                self.set_state(SessionState::Closed);
            }
        }
    }

    async fn hang_up(&mut self) {
        if self.hangup_issued || self.cancel.is_cancelled() {
            return;
        }
        let Some(call_id) = self.call_id.clone() else {
            return;
        };
        self.hangup_issued = true;

        let telephony = self.services.telephony.clone();
        match self
            .settings
            .call_policy
            .run("telephony.hangup", || telephony.hangup(&call_id))
            .await
        {
            Ok(()) => info!(call_id = %call_id, "Call ended by dialogue engine"),
            Err(e) => error!(call_id = %call_id, "Hangup failed: {}", e),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn set_state(&mut self, next: SessionState) {
        match self.state.transition(next) {
            Ok(state) => {
                debug!(
                    connection_id = %self.connection_id,
                    from = %self.state,
                    to = %state,
                    "Session state change"
                );
                self.state = state;
                self.state_tx.send_replace(state);
            }
            Err(e) => warn!(connection_id = %self.connection_id, "{}", e),
        }
    }

    /// Release the bridge, cancel outstanding work and leave the registry.
    /// Runs once; later calls are no-ops.
    fn close(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.cancel.cancel();
        if let Some(mut bridge) = self.bridge.take() {
            bridge.close();
        }
        self.pending.clear();
        if let Some(call_id) = &self.call_id {
            self.registry.remove(call_id, self.connection_id);
            if self.settings.delivery_mode == DeliveryMode::File {
                self.remove_call_audio(call_id.clone());
            }
        }
        if !self.state.is_closed() {
            self.set_state(SessionState::Closed);
        }

        info!(
            connection_id = %self.connection_id,
            call_id = self.call_id.as_deref().unwrap_or("-"),
            "Call session closed"
        );
    }

    /// Delete the call's stored reply audio in the background.
    fn remove_call_audio(&self, call_id: String) {
        let audio_store = self.services.audio_store.clone();
        tokio::spawn(async move {
            if let Err(e) = audio_store.remove(&call_id).await {
                warn!(call_id = %call_id, "Failed to remove call audio: {}", e);
            }
        });
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn keep_alive_timer(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
