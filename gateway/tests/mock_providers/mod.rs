//! In-process provider mocks for call session tests.
//!
//! Every mock appends to a shared [`EventLog`] so tests can assert on the
//! relative order of dialogue calls, synthesis, socket writes and call control.
//! [`spawn_socket_writer`] plays the part of the call socket: it records
//! outbound frames and acknowledges flushes.

// Not every test file uses every helper
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use callbridge::core::audio::AudioFileStore;
use callbridge::core::dialogue::{DialogueEngine, DialogueReply, DialogueResult};
use callbridge::core::session::{CallServices, OutboundFrame};
use callbridge::core::stt::{
    RecognitionConfig, RecognitionStream, STTError, STTResult, SpeechRecognizer, Transcript,
};
use callbridge::core::telephony::{TelephonyControl, TelephonyResult};
use callbridge::core::tts::{SpeechSynthesizer, SynthesisRequest, TTSResult};
use callbridge::utils::CallPolicy;

/// Something observable that happened during a call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    Dialogue { token: Option<String>, text: String },
    Synthesize(SynthesisRequest),
    Frame(Bytes),
    KeepAlive,
    Flush,
    PlayStream { call_id: String, url: String },
    Hangup(String),
}

#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<CallEvent>>>);

impl EventLog {
    pub fn push(&self, event: CallEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn snapshot(&self) -> Vec<CallEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&CallEvent) -> bool) -> usize {
        self.snapshot().iter().filter(|event| matches(event)).count()
    }

    pub fn position(&self, matches: impl Fn(&CallEvent) -> bool) -> Option<usize> {
        self.snapshot().iter().position(|event| matches(event))
    }

    pub fn rposition(&self, matches: impl Fn(&CallEvent) -> bool) -> Option<usize> {
        self.snapshot().iter().rposition(|event| matches(event))
    }

    /// Audio frames in the order they were written to the socket.
    pub fn frames(&self) -> Vec<Bytes> {
        self.snapshot()
            .into_iter()
            .filter_map(|event| match event {
                CallEvent::Frame(frame) => Some(frame),
                _ => None,
            })
            .collect()
    }

    pub fn dialogue_calls(&self) -> Vec<(Option<String>, String)> {
        self.snapshot()
            .into_iter()
            .filter_map(|event| match event {
                CallEvent::Dialogue { token, text } => Some((token, text)),
                _ => None,
            })
            .collect()
    }

    pub fn synthesized_texts(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|event| match event {
                CallEvent::Synthesize(request) => Some(request.text),
                _ => None,
            })
            .collect()
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// =============================================================================
// Recognition
// =============================================================================

/// The test side of a stream opened by [`MockRecognizer`].
pub struct OpenedStream {
    pub config: RecognitionConfig,
    pub audio: mpsc::Receiver<Bytes>,
    pub transcripts: mpsc::Sender<STTResult<Transcript>>,
}

impl OpenedStream {
    pub async fn say(&self, text: &str) {
        self.transcripts
            .send(Ok(Transcript::new(text, 0.9)))
            .await
            .unwrap();
    }

    pub async fn next_audio(&mut self) -> Option<Bytes> {
        tokio::time::timeout(Duration::from_secs(2), self.audio.recv())
            .await
            .ok()
            .flatten()
    }
}

pub struct MockRecognizer {
    opened: mpsc::UnboundedSender<OpenedStream>,
    fail_open: bool,
}

impl MockRecognizer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OpenedStream>) {
        let (opened, opened_rx) = mpsc::unbounded_channel();
        (
            Self {
                opened,
                fail_open: false,
            },
            opened_rx,
        )
    }

    pub fn unavailable() -> (Self, mpsc::UnboundedReceiver<OpenedStream>) {
        let (mut recognizer, opened_rx) = Self::new();
        recognizer.fail_open = true;
        (recognizer, opened_rx)
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn open_stream(&self, config: &RecognitionConfig) -> STTResult<RecognitionStream> {
        if self.fail_open {
            return Err(STTError::AuthenticationFailed("mock rejects key".to_string()));
        }

        let (audio_tx, audio_rx) = mpsc::channel(64);
        let (results_tx, results_rx) = mpsc::channel(16);
        let _ = self.opened.send(OpenedStream {
            config: config.clone(),
            audio: audio_rx,
            transcripts: results_tx,
        });

        Ok(RecognitionStream {
            audio: audio_tx,
            results: results_rx,
            task: None,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// =============================================================================
// Dialogue
// =============================================================================

/// Replies from a script; once the script runs out every turn gets "ok".
pub struct MockDialogue {
    log: EventLog,
    script: Mutex<VecDeque<DialogueResult<DialogueReply>>>,
    gate: Option<Arc<Notify>>,
}

impl MockDialogue {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            script: Mutex::new(VecDeque::new()),
            gate: None,
        }
    }

    pub fn reply(self, result: DialogueResult<DialogueReply>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    /// Hold every call until the gate is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

pub fn reply(text: &str, token: Option<&str>, end_call: bool) -> DialogueReply {
    DialogueReply {
        text: text.to_string(),
        session_token: token.map(str::to_string),
        end_call,
    }
}

#[async_trait]
impl DialogueEngine for MockDialogue {
    async fn send(
        &self,
        session_token: Option<&str>,
        text: &str,
    ) -> DialogueResult<DialogueReply> {
        self.log.push(CallEvent::Dialogue {
            token: session_token.map(str::to_string),
            text: text.to_string(),
        });
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(reply("ok", None, false)))
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// Returns `audio` for every request unless a scripted failure is queued.
pub struct MockSynthesizer {
    log: EventLog,
    audio: Bytes,
    failures: Mutex<VecDeque<callbridge::core::tts::TTSError>>,
}

impl MockSynthesizer {
    pub fn new(log: EventLog, audio: Bytes) -> Self {
        Self {
            log,
            audio,
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fail_next(self, error: callbridge::core::tts::TTSError) -> Self {
        self.failures.lock().unwrap().push_back(error);
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> TTSResult<Bytes> {
        self.log.push(CallEvent::Synthesize(request.clone()));
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(self.audio.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// =============================================================================
// Telephony
// =============================================================================

pub struct MockTelephony {
    log: EventLog,
    play_failure: Mutex<Option<callbridge::core::telephony::TelephonyError>>,
}

impl MockTelephony {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            play_failure: Mutex::new(None),
        }
    }

    pub fn failing_playback(self, error: callbridge::core::telephony::TelephonyError) -> Self {
        *self.play_failure.lock().unwrap() = Some(error);
        self
    }
}

#[async_trait]
impl TelephonyControl for MockTelephony {
    async fn play_stream(&self, call_id: &str, stream_url: &str) -> TelephonyResult<()> {
        self.log.push(CallEvent::PlayStream {
            call_id: call_id.to_string(),
            url: stream_url.to_string(),
        });
        match self.play_failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn hangup(&self, call_id: &str) -> TelephonyResult<()> {
        self.log.push(CallEvent::Hangup(call_id.to_string()));
        Ok(())
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// Deadlines short enough to keep failing tests fast.
pub fn fast_policy() -> CallPolicy {
    CallPolicy {
        timeout: Duration::from_secs(1),
        max_attempts: 2,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        backoff_multiplier: 2.0,
    }
}

pub fn services(
    recognizer: MockRecognizer,
    synthesizer: MockSynthesizer,
    dialogue: MockDialogue,
    telephony: MockTelephony,
    audio_dir: &TempDir,
) -> CallServices {
    CallServices {
        recognizer: Arc::new(recognizer),
        synthesizer: Arc::new(synthesizer),
        dialogue: Arc::new(dialogue),
        telephony: Arc::new(telephony),
        audio_store: Arc::new(AudioFileStore::new(audio_dir.path())),
    }
}

/// Drain a session's outbound queue the way the socket writer does.
pub fn spawn_socket_writer(
    mut outbound: mpsc::Receiver<OutboundFrame>,
    log: EventLog,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            match frame {
                OutboundFrame::Audio(audio) => log.push(CallEvent::Frame(audio)),
                OutboundFrame::KeepAlive => log.push(CallEvent::KeepAlive),
                OutboundFrame::Flush(ack) => {
                    log.push(CallEvent::Flush);
                    let _ = ack.send(());
                }
            }
        }
    })
}

/// Deterministic PCM-like payload where every byte encodes its position.
pub fn numbered_audio(len: usize) -> Bytes {
    Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
}
