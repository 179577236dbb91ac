//! Recognizer backends that need no platform engine.
//!
//! `ScriptedRecognizer` replays a fixed sequence of sessions and is the
//! workhorse of the capture and session tests. `UnsupportedRecognizer`
//! models a platform without speech recognition.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use brovox_foundation::error::CaptureError;

use crate::recognizer::{RecognizerEvent, RecognizerSession, SpeechRecognizer};
use crate::types::CaptureConfig;

const SESSION_CHANNEL_SIZE: usize = 32;

/// Script for a single recognition session.
#[derive(Debug)]
pub struct SessionScript {
    outcome: Result<Vec<RecognizerEvent>, CaptureError>,
}

impl SessionScript {
    /// Emit the given events, then stay open until cancelled. End the list
    /// with [`RecognizerEvent::Ended`] to simulate an unsolicited stop.
    pub fn events(events: Vec<RecognizerEvent>) -> Self {
        Self {
            outcome: Ok(events),
        }
    }

    /// A silent session that stays open until cancelled.
    pub fn hold_open() -> Self {
        Self {
            outcome: Ok(Vec::new()),
        }
    }

    /// `begin_session` fails, e.g. a denied permission prompt.
    pub fn rejected(err: CaptureError) -> Self {
        Self { outcome: Err(err) }
    }
}

/// Counters observable from tests while the recognizer is owned by the
/// supervisor task.
#[derive(Debug, Default)]
pub struct ScriptedRecognizerProbe {
    opened: AtomicUsize,
}

impl ScriptedRecognizerProbe {
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

/// Replays scripted sessions in order; once the script runs out, every
/// further session is silent and stays open.
pub struct ScriptedRecognizer {
    scripts: VecDeque<SessionScript>,
    probe: Arc<ScriptedRecognizerProbe>,
}

impl ScriptedRecognizer {
    pub fn new(scripts: Vec<SessionScript>) -> Self {
        Self {
            scripts: scripts.into(),
            probe: Arc::new(ScriptedRecognizerProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<ScriptedRecognizerProbe> {
        self.probe.clone()
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn begin_session(
        &mut self,
        _config: &CaptureConfig,
    ) -> Result<RecognizerSession, CaptureError> {
        let script = self
            .scripts
            .pop_front()
            .unwrap_or_else(SessionScript::hold_open);
        let events = script.outcome?;

        self.probe.opened.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_SIZE);
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        tokio::spawn(async move {
            for event in events {
                tokio::select! {
                    _ = &mut cancel_rx => return,
                    sent = tx.send(event) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
            // Hold the session open until the supervisor cancels or drops it.
            let _ = cancel_rx.await;
        });

        Ok(RecognizerSession::new(rx, cancel_tx))
    }
}

/// Recognizer fed by hand through a [`PushRecognizerHandle`]. Each
/// `begin_session` opens a fresh session; pushed events go to the most
/// recently opened one.
pub struct PushRecognizer {
    shared: Arc<parking_lot::Mutex<Option<mpsc::Sender<RecognizerEvent>>>>,
}

#[derive(Clone)]
pub struct PushRecognizerHandle {
    shared: Arc<parking_lot::Mutex<Option<mpsc::Sender<RecognizerEvent>>>>,
}

impl PushRecognizerHandle {
    /// Deliver an event to the current session, waiting briefly for one to
    /// open if capture is still starting up.
    pub async fn push(&self, event: RecognizerEvent) {
        for _ in 0..500 {
            let tx = self.shared.lock().clone();
            if let Some(tx) = tx {
                let _ = tx.send(event).await;
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("no recognizer session opened within the push timeout");
    }

    pub async fn push_final(&self, text: &str) {
        self.push(RecognizerEvent::Result(
            crate::types::TranscriptEvent::final_text(text, 0.9),
        ))
        .await;
    }
}

impl Default for PushRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PushRecognizer {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    pub fn handle(&self) -> PushRecognizerHandle {
        PushRecognizerHandle {
            shared: self.shared.clone(),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for PushRecognizer {
    async fn begin_session(
        &mut self,
        _config: &CaptureConfig,
    ) -> Result<RecognizerSession, CaptureError> {
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_SIZE);
        *self.shared.lock() = Some(tx);
        // Cancellation only needs to stop event delivery; replacing the
        // sender on the next session does that, and the receiver side is
        // dropped by the supervisor.
        let (cancel_tx, _cancel_rx) = oneshot::channel();
        Ok(RecognizerSession::new(rx, cancel_tx))
    }
}

/// Platform without a speech engine: `is_supported` is false and the
/// supervisor turns every start into a warned no-op.
pub struct UnsupportedRecognizer;

#[async_trait]
impl SpeechRecognizer for UnsupportedRecognizer {
    fn is_supported(&self) -> bool {
        false
    }

    async fn begin_session(
        &mut self,
        _config: &CaptureConfig,
    ) -> Result<RecognizerSession, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}
