//! The session controller.
//!
//! Owns the Dormant/Awake/Processing/Speaking lifecycle and is the only
//! writer of session state. Transcripts, synthesis completions, and
//! control commands arrive on channels and are handled strictly in
//! arrival order; each final transcript can change the state, and the
//! next event must see the change.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use brovox_command::{catalog, interpret, ActiveFeatureSet, CommandResult, Effect};
use brovox_foundation::error::CaptureError;
use brovox_foundation::state::{SessionState, SessionStateCell};
use brovox_stt::{CaptureEvent, CaptureHandle};
use brovox_telemetry::PipelineMetrics;
use brovox_tts::{OutputHandle, SynthesisEvent, VoiceProfile};
use brovox_wake::{Language, WakePhraseSet};

use crate::ports::{ChatSender, FeatureLauncher, MemoryStore, NotificationSink, NotifyKind};

const CONTROL_CHANNEL_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Shutdown,
}

#[derive(Clone)]
pub struct SessionHandle {
    control_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub async fn shutdown(&self) {
        let _ = self.control_tx.send(SessionCommand::Shutdown).await;
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub language: Language,
    pub voice_profile: VoiceProfile,
    pub start_muted: bool,
    pub user_id: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            language: Language::English,
            voice_profile: VoiceProfile::default(),
            start_muted: false,
            user_id: "default".to_string(),
        }
    }
}

pub struct SessionController {
    options: SessionOptions,
    wake: WakePhraseSet,
    state: Arc<SessionStateCell>,
    /// Target state once the in-flight utterance resolves.
    pending_after_speech: SessionState,
    features: ActiveFeatureSet,
    muted: bool,
    capture: CaptureHandle,
    capture_rx: mpsc::Receiver<CaptureEvent>,
    output: OutputHandle,
    synthesis_rx: mpsc::Receiver<SynthesisEvent>,
    control_rx: mpsc::Receiver<SessionCommand>,
    notifier: Arc<dyn NotificationSink>,
    store: Arc<dyn MemoryStore>,
    launcher: Arc<dyn FeatureLauncher>,
    metrics: Arc<PipelineMetrics>,
}

impl SessionController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        options: SessionOptions,
        capture: CaptureHandle,
        capture_rx: mpsc::Receiver<CaptureEvent>,
        output: OutputHandle,
        synthesis_rx: mpsc::Receiver<SynthesisEvent>,
        notifier: Arc<dyn NotificationSink>,
        store: Arc<dyn MemoryStore>,
        launcher: Arc<dyn FeatureLauncher>,
        metrics: Arc<PipelineMetrics>,
    ) -> (Self, SessionHandle) {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_SIZE);
        let muted = options.start_muted;
        let wake = WakePhraseSet::for_language(options.language);
        let controller = Self {
            options,
            wake,
            state: Arc::new(SessionStateCell::new()),
            pending_after_speech: SessionState::Dormant,
            features: ActiveFeatureSet::new(),
            muted,
            capture,
            capture_rx,
            output,
            synthesis_rx,
            control_rx,
            notifier,
            store,
            launcher,
            metrics,
        };
        (controller, SessionHandle { control_tx })
    }

    /// Shared view of the state cell, for observers and tests.
    pub fn state_cell(&self) -> Arc<SessionStateCell> {
        self.state.clone()
    }

    pub async fn run(mut self) {
        info!(
            target: "session",
            "Session starting (language: {:?}, muted: {})",
            self.options.language, self.muted
        );
        self.capture.start().await;

        loop {
            tokio::select! {
                cmd = self.control_rx.recv() => match cmd {
                    Some(SessionCommand::Shutdown) | None => break,
                },
                Some(event) = self.capture_rx.recv() => self.handle_capture_event(event).await,
                Some(event) = self.synthesis_rx.recv() => self.handle_synthesis_event(event).await,
            }
        }

        // Return the controller to an inert condition: capture off, any
        // in-flight utterance cancelled.
        self.capture.stop().await;
        self.output.stop().await;
        self.metrics.log_summary();
        info!(target: "session", "Session shut down");
    }

    async fn handle_capture_event(&mut self, event: CaptureEvent) {
        match event {
            CaptureEvent::Transcript(transcript) => {
                if !transcript.is_final {
                    // Interim results exist for live-transcript UI only.
                    return;
                }
                match self.state.current() {
                    SessionState::Speaking | SessionState::Processing => {
                        // Self-echo immunity: drop, never queue.
                        self.metrics
                            .transcripts_suppressed
                            .fetch_add(1, Ordering::Relaxed);
                        debug!(target: "session", "Transcript dropped while speaking: {}", transcript.text);
                    }
                    SessionState::Dormant => self.handle_dormant_transcript(&transcript.text).await,
                    SessionState::Awake => self.handle_awake_transcript(&transcript.text).await,
                }
            }
            CaptureEvent::Failed(err) => self.handle_capture_failure(err).await,
        }
    }

    async fn handle_dormant_transcript(&mut self, text: &str) {
        if !self.wake.matches(text) {
            debug!(target: "session", "No wake phrase in: {}", text);
            return;
        }
        self.metrics.wake_matches.fetch_add(1, Ordering::Relaxed);
        info!(target: "session", "Wake phrase matched");

        let greeting = self.greeting();
        self.store
            .append_message(&self.options.user_id, text, ChatSender::User);
        self.store
            .append_message(&self.options.user_id, greeting, ChatSender::Assistant);
        self.speak_then(greeting, SessionState::Awake).await;
    }

    async fn handle_awake_transcript(&mut self, text: &str) {
        self.transition(SessionState::Processing);
        self.store
            .append_message(&self.options.user_id, text, ChatSender::User);

        // `interpret` has no throwing paths; a panic here is a programming
        // defect. Tests let it propagate, the session converts it to a
        // fallback response instead of dying mid-conversation.
        let result = catch_unwind(AssertUnwindSafe(|| interpret(text, &self.features)))
            .unwrap_or_else(|_| {
                self.metrics
                    .interpreter_defects
                    .fetch_add(1, Ordering::Relaxed);
                error!(target: "session", "Interpreter panicked on: {}", text);
                CommandResult::spoken("Something went wrong on my end, bro. Try that again?")
            });
        self.metrics
            .commands_interpreted
            .fetch_add(1, Ordering::Relaxed);

        let mut target = SessionState::Awake;
        for effect in &result.effects {
            if self.apply_effect(effect) {
                target = SessionState::Dormant;
            }
        }

        self.store.append_message(
            &self.options.user_id,
            &result.response_text,
            ChatSender::Assistant,
        );
        self.speak_then(&result.response_text, target).await;
    }

    /// Returns true when the effect requests sleep.
    fn apply_effect(&mut self, effect: &Effect) -> bool {
        match effect {
            Effect::ActivateFeature(id) => {
                if self.features.activate(id) {
                    if let Some(entry) = catalog::lookup(id) {
                        self.launcher.open_external(entry.url);
                    }
                    self.notifier
                        .notify("Feature", &format!("{} activated", id), NotifyKind::Info);
                }
                false
            }
            Effect::DeactivateFeature(id) => {
                if self.features.deactivate(id) {
                    self.notifier
                        .notify("Feature", &format!("{} deactivated", id), NotifyKind::Info);
                }
                false
            }
            Effect::Mute => {
                if !self.muted {
                    self.muted = true;
                    self.notifier
                        .notify("Voice", "Responses muted", NotifyKind::Info);
                }
                false
            }
            Effect::Unmute => {
                if self.muted {
                    self.muted = false;
                    self.notifier
                        .notify("Voice", "Responses unmuted", NotifyKind::Info);
                }
                false
            }
            Effect::Sleep => true,
        }
    }

    /// Speak `text`, then land on `target`. Muted or empty speech takes the
    /// same transitions as if the utterance completed instantly.
    async fn speak_then(&mut self, text: &str, target: SessionState) {
        if self.muted || text.is_empty() {
            self.transition(target);
            return;
        }
        self.pending_after_speech = target;
        self.transition(SessionState::Speaking);
        self.output.speak(text, &self.options.voice_profile).await;
    }

    async fn handle_synthesis_event(&mut self, event: SynthesisEvent) {
        match event {
            SynthesisEvent::Started { .. } => {}
            SynthesisEvent::Completed { .. } | SynthesisEvent::Cancelled { .. } => {
                self.finish_speaking();
            }
            SynthesisEvent::Failed { error, .. } => {
                // Already logged by the output task; resolve the pending
                // state so a failed utterance cannot strand us in Speaking.
                debug!(target: "session", "Utterance failed: {}", error);
                self.finish_speaking();
            }
        }
    }

    fn finish_speaking(&mut self) {
        if self.state.current() == SessionState::Speaking {
            self.transition(self.pending_after_speech);
        }
    }

    async fn handle_capture_failure(&mut self, err: CaptureError) {
        let message = match &err {
            CaptureError::PermissionDenied => {
                "Microphone access was denied. Click start to try again.".to_string()
            }
            other => format!("Speech recognition stopped: {other}. Click start to try again."),
        };
        self.notifier
            .notify("Microphone", &message, NotifyKind::Error);

        // Capture is already inactive; park the session in Dormant until
        // the user explicitly restarts.
        if self.state.current() != SessionState::Dormant {
            self.output.stop().await;
            self.transition(SessionState::Dormant);
        }
    }

    fn greeting(&self) -> &'static str {
        match self.options.language {
            Language::English => "Yes bro, I'm listening. What do you need?",
            Language::Hinglish => "Haan bro, bolo. Main sun raha hoon.",
        }
    }

    fn transition(&self, target: SessionState) {
        if let Err(e) = self.state.transition(target) {
            // Transition table violations are programming defects; log loudly
            // instead of crashing a live session.
            error!(target: "session", "{}", e);
        }
    }
}
