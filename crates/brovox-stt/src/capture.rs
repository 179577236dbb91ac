//! Capture supervisor.
//!
//! Keeps continuous recognition alive across unsolicited platform
//! terminations. A single authoritative `desired_listening` flag decides
//! whether an `Ended` event triggers a restart; `stop()` clears it before
//! the session is torn down, which closes the race between an explicit stop
//! and an in-flight end event.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use brovox_foundation::clock::Clock;
use brovox_foundation::error::CaptureError;
use brovox_telemetry::PipelineMetrics;

use crate::recognizer::{RecognizerEvent, RecognizerSession, SpeechRecognizer};
use crate::types::{CaptureConfig, CaptureEvent, ErrorSeverity};

const CONTROL_CHANNEL_SIZE: usize = 16;
const EVENT_CHANNEL_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCommand {
    Start,
    Stop,
}

/// Cheap handle for controlling a spawned supervisor.
#[derive(Clone)]
pub struct CaptureHandle {
    control_tx: mpsc::Sender<CaptureCommand>,
}

impl CaptureHandle {
    /// Idempotent; a second start while listening only logs.
    pub async fn start(&self) {
        let _ = self.control_tx.send(CaptureCommand::Start).await;
    }

    /// Safe at any time, including when capture is already idle.
    pub async fn stop(&self) {
        let _ = self.control_tx.send(CaptureCommand::Stop).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Listening,
    /// Unsolicited end observed; reopening after the backoff.
    Restarting,
}

enum Step {
    Command(Option<CaptureCommand>),
    Session(Option<RecognizerEvent>),
    BackoffElapsed,
}

/// Supervises one recognizer backend. At most one platform session is live
/// at a time; any prior session is cancelled before a new one opens.
pub struct CaptureSupervisor<R: SpeechRecognizer> {
    recognizer: R,
    config: CaptureConfig,
    event_tx: mpsc::Sender<CaptureEvent>,
    control_rx: mpsc::Receiver<CaptureCommand>,
    clock: Arc<dyn Clock>,
    metrics: Arc<PipelineMetrics>,
    desired_listening: bool,
    state: CaptureState,
    session: Option<RecognizerSession>,
}

impl<R: SpeechRecognizer + 'static> CaptureSupervisor<R> {
    pub fn new(
        recognizer: R,
        config: CaptureConfig,
        event_tx: mpsc::Sender<CaptureEvent>,
        control_rx: mpsc::Receiver<CaptureCommand>,
        clock: Arc<dyn Clock>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            recognizer,
            config,
            event_tx,
            control_rx,
            clock,
            metrics,
            desired_listening: false,
            state: CaptureState::Idle,
            session: None,
        }
    }

    /// Spawn the supervisor, returning its control handle and the capture
    /// event stream.
    pub fn spawn(
        recognizer: R,
        config: CaptureConfig,
        clock: Arc<dyn Clock>,
        metrics: Arc<PipelineMetrics>,
    ) -> (CaptureHandle, mpsc::Receiver<CaptureEvent>, JoinHandle<()>) {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_SIZE);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let supervisor = Self::new(recognizer, config, event_tx, control_rx, clock, metrics);
        let handle = tokio::spawn(supervisor.run());
        (CaptureHandle { control_tx }, event_rx, handle)
    }

    pub async fn run(mut self) {
        info!(target: "capture", "Capture supervisor starting (lang: {})", self.config.language_tag);

        loop {
            let step = match self.state {
                CaptureState::Idle => Step::Command(self.control_rx.recv().await),
                CaptureState::Listening => {
                    let Self {
                        control_rx,
                        session,
                        ..
                    } = &mut self;
                    let session = session.as_mut().expect("listening without a session");
                    tokio::select! {
                        cmd = control_rx.recv() => Step::Command(cmd),
                        ev = session.recv() => Step::Session(ev),
                    }
                }
                CaptureState::Restarting => {
                    let Self {
                        control_rx,
                        clock,
                        config,
                        ..
                    } = &mut self;
                    tokio::select! {
                        cmd = control_rx.recv() => Step::Command(cmd),
                        _ = clock.sleep(config.restart_backoff) => Step::BackoffElapsed,
                    }
                }
            };

            match step {
                Step::Command(None) => break,
                Step::Command(Some(cmd)) => self.handle_command(cmd).await,
                Step::Session(Some(event)) => self.handle_session_event(event).await,
                // A closed event channel is an end the backend never reported.
                Step::Session(None) => self.handle_session_end(),
                Step::BackoffElapsed => {
                    self.metrics.capture_restarts.fetch_add(1, Ordering::Relaxed);
                    debug!(target: "capture", "Backoff elapsed, reopening recognizer");
                    self.open_session().await;
                }
            }
        }

        if let Some(mut session) = self.session.take() {
            session.cancel();
        }
        info!(target: "capture", "Capture supervisor shutting down: control channel closed");
    }

    async fn handle_command(&mut self, cmd: CaptureCommand) {
        match cmd {
            CaptureCommand::Start => {
                if self.state == CaptureState::Listening {
                    debug!(target: "capture", "start() while already listening: no-op");
                    return;
                }
                self.desired_listening = true;
                self.open_session().await;
            }
            CaptureCommand::Stop => {
                // Clear the flag first: a natural Ended arriving after this
                // point must not restart.
                self.desired_listening = false;
                if let Some(mut session) = self.session.take() {
                    session.cancel();
                    info!(target: "capture", "Capture stopped");
                } else {
                    debug!(target: "capture", "stop() while idle: no-op");
                }
                self.state = CaptureState::Idle;
            }
        }
    }

    async fn open_session(&mut self) {
        // Cancel-before-start: the recognizer is an exclusive resource.
        if let Some(mut prior) = self.session.take() {
            prior.cancel();
        }

        if !self.recognizer.is_supported() {
            warn!(target: "capture", "Speech recognition not supported on this platform; start ignored");
            self.desired_listening = false;
            self.state = CaptureState::Idle;
            return;
        }

        match self.recognizer.begin_session(&self.config).await {
            Ok(session) => {
                self.session = Some(session);
                self.state = CaptureState::Listening;
                debug!(target: "capture", "Recognizer session open");
            }
            Err(err) => self.fail(err).await,
        }
    }

    async fn handle_session_event(&mut self, event: RecognizerEvent) {
        match event {
            RecognizerEvent::Result(transcript) => {
                if transcript.is_final {
                    self.metrics.mark_final_transcript();
                } else {
                    self.metrics
                        .transcripts_partial
                        .fetch_add(1, Ordering::Relaxed);
                    if !self.config.interim_results {
                        return;
                    }
                }
                let _ = self
                    .event_tx
                    .send(CaptureEvent::Transcript(transcript))
                    .await;
            }
            RecognizerEvent::Error(code) => match code.severity() {
                ErrorSeverity::Transient => {
                    debug!(target: "capture", "Transient recognizer error absorbed: {:?}", code);
                }
                ErrorSeverity::Terminal(err) => self.fail(err).await,
            },
            RecognizerEvent::Ended => self.handle_session_end(),
        }
    }

    fn handle_session_end(&mut self) {
        self.session = None;
        if self.desired_listening {
            debug!(
                target: "capture",
                "Recognizer ended unsolicited; restarting in {:?}",
                self.config.restart_backoff
            );
            self.state = CaptureState::Restarting;
        } else {
            self.state = CaptureState::Idle;
        }
    }

    /// Terminal failure: stop listening, surface exactly one Failed event.
    async fn fail(&mut self, err: CaptureError) {
        self.desired_listening = false;
        self.state = CaptureState::Idle;
        if let Some(mut session) = self.session.take() {
            session.cancel();
        }
        self.metrics.capture_errors.fetch_add(1, Ordering::Relaxed);
        error!(target: "capture", "Capture failed: {}", err);
        let _ = self.event_tx.send(CaptureEvent::Failed(err)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{ScriptedRecognizer, SessionScript, UnsupportedRecognizer};
    use crate::types::{RecognitionErrorCode, TranscriptEvent};
    use brovox_foundation::clock::TestClock;
    use std::time::Duration;

    fn spawn_with_scripts(
        scripts: Vec<SessionScript>,
    ) -> (
        CaptureHandle,
        mpsc::Receiver<CaptureEvent>,
        Arc<ScriptedRecognizerProbe>,
        Arc<TestClock>,
    ) {
        let recognizer = ScriptedRecognizer::new(scripts);
        let probe = recognizer.probe();
        let clock = Arc::new(TestClock::new());
        let metrics = Arc::new(PipelineMetrics::default());
        let (handle, events, _join) = CaptureSupervisor::spawn(
            recognizer,
            CaptureConfig::default(),
            clock.clone(),
            metrics,
        );
        (handle, events, probe, clock)
    }

    use crate::backends::ScriptedRecognizerProbe;

    #[tokio::test]
    async fn transcripts_flow_through() {
        let (handle, mut events, _probe, _clock) = spawn_with_scripts(vec![SessionScript::events(
            vec![
                RecognizerEvent::Result(TranscriptEvent::interim("hey", 0.4)),
                RecognizerEvent::Result(TranscriptEvent::final_text("hey bro", 0.92)),
            ],
        )]);
        handle.start().await;

        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Transcript(TranscriptEvent::interim("hey", 0.4))
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Transcript(TranscriptEvent::final_text("hey bro", 0.92))
        );
    }

    #[tokio::test]
    async fn unsolicited_end_restarts_after_backoff() {
        let (handle, mut events, probe, clock) = spawn_with_scripts(vec![
            SessionScript::events(vec![RecognizerEvent::Ended]),
            SessionScript::events(vec![RecognizerEvent::Result(TranscriptEvent::final_text(
                "back again",
                0.8,
            ))]),
        ]);
        handle.start().await;

        // The second session only exists because the supervisor restarted.
        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            CaptureEvent::Transcript(TranscriptEvent::final_text("back again", 0.8))
        );
        assert_eq!(probe.sessions_opened(), 2);
        assert_eq!(
            clock.recorded_sleeps(),
            vec![Duration::from_millis(100)],
            "restart must wait out the backoff"
        );
    }

    #[tokio::test]
    async fn stop_suppresses_restart() {
        let (handle, mut events, probe, _clock) = spawn_with_scripts(vec![
            SessionScript::hold_open(),
            SessionScript::events(vec![RecognizerEvent::Result(TranscriptEvent::final_text(
                "should never arrive",
                0.9,
            ))]),
        ]);
        handle.start().await;
        handle.stop().await;

        // Give the supervisor time to process; no restart means the second
        // script is never consumed and no event ever shows up.
        tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .expect_err("no events after stop");
        assert_eq!(probe.sessions_opened(), 1);
    }

    #[tokio::test]
    async fn not_allowed_fails_terminally_once() {
        let (handle, mut events, probe, clock) = spawn_with_scripts(vec![
            SessionScript::events(vec![RecognizerEvent::Error(
                RecognitionErrorCode::NotAllowed,
            )]),
            SessionScript::hold_open(),
        ]);
        handle.start().await;

        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Failed(CaptureError::PermissionDenied)
        );
        // Terminal: no auto-restart, no backoff sleep, no second session.
        tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .expect_err("no further events after terminal failure");
        assert_eq!(probe.sessions_opened(), 1);
        assert!(clock.recorded_sleeps().is_empty());
    }

    #[tokio::test]
    async fn no_speech_is_absorbed() {
        let (handle, mut events, _probe, _clock) = spawn_with_scripts(vec![SessionScript::events(
            vec![
                RecognizerEvent::Error(RecognitionErrorCode::NoSpeech),
                RecognizerEvent::Result(TranscriptEvent::final_text("still here", 0.7)),
            ],
        )]);
        handle.start().await;

        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Transcript(TranscriptEvent::final_text("still here", 0.7))
        );
    }

    #[tokio::test]
    async fn begin_session_rejection_surfaces_permission_denied() {
        let (handle, mut events, _probe, _clock) = spawn_with_scripts(vec![
            SessionScript::rejected(CaptureError::PermissionDenied),
        ]);
        handle.start().await;

        assert_eq!(
            events.recv().await.unwrap(),
            CaptureEvent::Failed(CaptureError::PermissionDenied)
        );
    }

    #[tokio::test]
    async fn unsupported_platform_start_is_a_noop() {
        let clock = Arc::new(TestClock::new());
        let metrics = Arc::new(PipelineMetrics::default());
        let (handle, mut events, _join) = CaptureSupervisor::spawn(
            UnsupportedRecognizer,
            CaptureConfig::default(),
            clock,
            metrics,
        );
        handle.start().await;
        tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .expect_err("unsupported platform emits nothing");
    }

    #[tokio::test]
    async fn stop_while_idle_is_safe() {
        let (handle, mut events, probe, _clock) =
            spawn_with_scripts(vec![SessionScript::hold_open()]);
        handle.stop().await;
        handle.stop().await;
        tokio::time::timeout(Duration::from_millis(50), events.recv())
            .await
            .expect_err("no events");
        assert_eq!(probe.sessions_opened(), 0);
    }
}
