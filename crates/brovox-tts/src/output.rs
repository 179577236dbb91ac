//! The speech output task.
//!
//! Owns the synthesis backend and enforces the one-utterance-at-a-time
//! discipline: a new `speak` cancels whatever is in flight, and completion
//! events carrying a stale synthesis id are discarded, so a cancelled
//! utterance can never report completion downstream.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use brovox_telemetry::PipelineMetrics;

use crate::engine::{BackendEvent, SynthesisBackend, SynthesisEvent, Utterance};
use crate::next_synthesis_id;
use crate::normalize::normalize_text;
use crate::types::VoiceProfile;
use crate::voice::select_voice;

const COMMAND_CHANNEL_SIZE: usize = 16;
const EVENT_CHANNEL_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCommand {
    Speak { text: String, profile: VoiceProfile },
    Stop,
}

/// Cheap handle for controlling a spawned output task.
#[derive(Clone)]
pub struct OutputHandle {
    command_tx: mpsc::Sender<OutputCommand>,
    metrics: Arc<PipelineMetrics>,
}

impl OutputHandle {
    /// Queue an utterance; preempts anything currently speaking. Returns
    /// immediately, completion arrives on the synthesis event stream.
    pub async fn speak(&self, text: impl Into<String>, profile: &VoiceProfile) {
        let _ = self
            .command_tx
            .send(OutputCommand::Speak {
                text: text.into(),
                profile: profile.clone(),
            })
            .await;
    }

    /// Cancel in-flight synthesis. Safe when idle.
    pub async fn stop(&self) {
        let _ = self.command_tx.send(OutputCommand::Stop).await;
    }

    pub fn is_speaking(&self) -> bool {
        self.metrics.is_speaking.load(Ordering::SeqCst)
    }
}

pub struct SpeechOutput<B: SynthesisBackend> {
    backend: B,
    backend_rx: mpsc::Receiver<BackendEvent>,
    command_rx: mpsc::Receiver<OutputCommand>,
    event_tx: mpsc::Sender<SynthesisEvent>,
    metrics: Arc<PipelineMetrics>,
    current_id: Option<u64>,
}

impl<B: SynthesisBackend + 'static> SpeechOutput<B> {
    /// Spawn the output task. `backend_rx` is the completion channel the
    /// backend was built with.
    pub fn spawn(
        backend: B,
        backend_rx: mpsc::Receiver<BackendEvent>,
        metrics: Arc<PipelineMetrics>,
    ) -> (OutputHandle, mpsc::Receiver<SynthesisEvent>, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let output = Self {
            backend,
            backend_rx,
            command_rx,
            event_tx,
            metrics: metrics.clone(),
            current_id: None,
        };
        let handle = tokio::spawn(output.run());
        (
            OutputHandle {
                command_tx,
                metrics,
            },
            event_rx,
            handle,
        )
    }

    pub async fn run(mut self) {
        info!(target: "tts", "Speech output task starting");
        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(OutputCommand::Speak { text, profile }) => self.speak(text, profile).await,
                    Some(OutputCommand::Stop) => self.stop().await,
                    None => break,
                },
                Some(event) = self.backend_rx.recv() => self.handle_backend_event(event).await,
            }
        }
        self.backend.cancel();
        info!(target: "tts", "Speech output task shutting down: command channel closed");
    }

    async fn speak(&mut self, text: String, profile: VoiceProfile) {
        // Preempt first: the synthesis engine is an exclusive resource.
        if let Some(prev) = self.current_id.take() {
            self.backend.cancel();
            self.metrics
                .utterances_preempted
                .fetch_add(1, Ordering::Relaxed);
            debug!(target: "tts", "Utterance {} preempted", prev);
            let _ = self
                .event_tx
                .send(SynthesisEvent::Cancelled { synthesis_id: prev })
                .await;
        }

        let text = normalize_text(&text);
        if text.is_empty() {
            debug!(target: "tts", "Empty utterance skipped");
            return;
        }

        let profile = profile.clamped();
        let voice = select_voice(&self.backend.voices(), &profile.language_tag);
        let synthesis_id = next_synthesis_id();
        let utterance = Utterance {
            synthesis_id,
            text,
            voice,
            pitch: profile.pitch,
            rate: profile.rate,
            volume: profile.volume,
        };

        match self.backend.begin(utterance) {
            Ok(()) => {
                self.current_id = Some(synthesis_id);
                self.metrics
                    .utterances_started
                    .fetch_add(1, Ordering::Relaxed);
                self.metrics.is_speaking.store(true, Ordering::SeqCst);
                let _ = self
                    .event_tx
                    .send(SynthesisEvent::Started { synthesis_id })
                    .await;
            }
            Err(err) => {
                // An utterance failure must never strand the session in
                // Speaking: report it and stay not-speaking.
                error!(target: "tts", "Synthesis failed to start: {}", err);
                self.metrics.synthesis_errors.fetch_add(1, Ordering::Relaxed);
                self.metrics.is_speaking.store(false, Ordering::SeqCst);
                let _ = self
                    .event_tx
                    .send(SynthesisEvent::Failed {
                        synthesis_id,
                        error: err.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn stop(&mut self) {
        let Some(synthesis_id) = self.current_id.take() else {
            debug!(target: "tts", "stop() while idle: no-op");
            return;
        };
        self.backend.cancel();
        self.metrics.is_speaking.store(false, Ordering::SeqCst);
        let _ = self
            .event_tx
            .send(SynthesisEvent::Cancelled { synthesis_id })
            .await;
    }

    async fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Finished { synthesis_id } => {
                if self.current_id != Some(synthesis_id) {
                    debug!(target: "tts", "Stale completion for {} ignored", synthesis_id);
                    return;
                }
                self.current_id = None;
                self.metrics.is_speaking.store(false, Ordering::SeqCst);
                self.metrics
                    .utterances_completed
                    .fetch_add(1, Ordering::Relaxed);
                let _ = self
                    .event_tx
                    .send(SynthesisEvent::Completed { synthesis_id })
                    .await;
            }
            BackendEvent::Failed {
                synthesis_id,
                error,
            } => {
                if self.current_id != Some(synthesis_id) {
                    debug!(target: "tts", "Stale failure for {} ignored", synthesis_id);
                    return;
                }
                self.current_id = None;
                error!(target: "tts", "Synthesis failed: {}", error);
                self.metrics.synthesis_errors.fetch_add(1, Ordering::Relaxed);
                self.metrics.is_speaking.store(false, Ordering::SeqCst);
                let _ = self
                    .event_tx
                    .send(SynthesisEvent::Failed {
                        synthesis_id,
                        error,
                    })
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use std::time::Duration;

    fn spawn_manual() -> (
        OutputHandle,
        mpsc::Receiver<SynthesisEvent>,
        crate::backends::MockBackendHandle,
    ) {
        let (backend_tx, backend_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let backend = MockBackend::new(backend_tx);
        let control = backend.handle();
        let metrics = Arc::new(PipelineMetrics::default());
        let (handle, events, _join) = SpeechOutput::spawn(backend, backend_rx, metrics);
        (handle, events, control)
    }

    async fn expect_started(events: &mut mpsc::Receiver<SynthesisEvent>) -> u64 {
        match events.recv().await.unwrap() {
            SynthesisEvent::Started { synthesis_id } => synthesis_id,
            other => panic!("expected Started, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn utterance_completes_and_clears_speaking() {
        let (handle, mut events, control) = spawn_manual();
        handle.speak("hello there", &VoiceProfile::default()).await;

        let id = expect_started(&mut events).await;
        assert!(handle.is_speaking());

        control.finish_current();
        assert_eq!(
            events.recv().await.unwrap(),
            SynthesisEvent::Completed { synthesis_id: id }
        );
        assert!(!handle.is_speaking());
    }

    #[tokio::test]
    async fn new_speak_preempts_previous_utterance() {
        let (handle, mut events, control) = spawn_manual();
        handle.speak("A", &VoiceProfile::default()).await;
        let id_a = expect_started(&mut events).await;

        handle.speak("B", &VoiceProfile::default()).await;
        assert_eq!(
            events.recv().await.unwrap(),
            SynthesisEvent::Cancelled { synthesis_id: id_a }
        );
        let id_b = expect_started(&mut events).await;
        assert_ne!(id_a, id_b);

        // Only B's completion ever fires; A was cancelled in the backend.
        control.finish_current();
        assert_eq!(
            events.recv().await.unwrap(),
            SynthesisEvent::Completed { synthesis_id: id_b }
        );
        tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .expect_err("no further events");
        assert_eq!(control.begun_texts(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let (handle, mut events, control) = spawn_manual();
        handle.speak("A", &VoiceProfile::default()).await;
        let id_a = expect_started(&mut events).await;

        // The platform reports A finishing after it was already preempted.
        handle.speak("B", &VoiceProfile::default()).await;
        assert_eq!(
            events.recv().await.unwrap(),
            SynthesisEvent::Cancelled { synthesis_id: id_a }
        );
        let id_b = expect_started(&mut events).await;
        control.report_finished(id_a);
        control.report_finished(id_b);

        assert_eq!(
            events.recv().await.unwrap(),
            SynthesisEvent::Completed { synthesis_id: id_b }
        );
        tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .expect_err("A's completion must never surface");
    }

    #[tokio::test]
    async fn stop_cancels_and_is_safe_when_idle() {
        let (handle, mut events, _control) = spawn_manual();
        handle.stop().await; // idle: no-op

        handle.speak("A", &VoiceProfile::default()).await;
        let id = expect_started(&mut events).await;
        handle.stop().await;
        assert_eq!(
            events.recv().await.unwrap(),
            SynthesisEvent::Cancelled { synthesis_id: id }
        );
        assert!(!handle.is_speaking());

        handle.stop().await; // idle again: still safe
        tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .expect_err("no further events");
    }

    #[tokio::test]
    async fn text_is_normalized_before_the_backend() {
        let (handle, mut events, control) = spawn_manual();
        handle
            .speak("Opening email...  one sec ,bro", &VoiceProfile::default())
            .await;
        expect_started(&mut events).await;
        assert_eq!(control.begun_texts(), vec!["Opening email. one sec,bro"]);
    }

    #[tokio::test]
    async fn voices_loaded_late_are_used_on_the_next_utterance() {
        let (handle, mut events, control) = spawn_manual();
        handle.speak("first", &VoiceProfile::default()).await;
        expect_started(&mut events).await;
        control.finish_current();
        events.recv().await.unwrap();

        // The platform voice list finishes loading mid-session.
        control.add_voice(crate::types::VoiceInfo {
            id: "v1".into(),
            name: "Samantha".into(),
            language: "en-US".into(),
        });
        handle.speak("second", &VoiceProfile::default()).await;
        expect_started(&mut events).await;

        let begun = control.begun();
        assert_eq!(begun[0].voice, None, "no voices were loaded yet");
        assert_eq!(begun[1].voice.as_ref().unwrap().id, "v1");
    }

    #[tokio::test]
    async fn begin_failure_reports_failed_and_not_speaking() {
        let (handle, mut events, control) = spawn_manual();
        control.fail_next_begin("engine busy");
        handle.speak("doomed", &VoiceProfile::default()).await;
        match events.recv().await.unwrap() {
            SynthesisEvent::Failed { error, .. } => assert!(error.contains("engine busy")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(!handle.is_speaking());
    }
}
