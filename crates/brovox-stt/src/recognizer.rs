//! Recognizer backend boundary.
//!
//! A backend owns the platform recognizer (browser engine, scripted mock,
//! stdin). Each `begin_session` call is one platform recognition session;
//! the platform may end it at any time, which backends report with
//! [`RecognizerEvent::Ended`]. The supervisor decides whether that end was
//! solicited.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use brovox_foundation::error::CaptureError;

use crate::types::{CaptureConfig, RecognitionErrorCode, TranscriptEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    Result(TranscriptEvent),
    Error(RecognitionErrorCode),
    /// The platform session ended (silence timeout, service quirk, or a
    /// natural stop). Carries no verdict on whether a restart is wanted.
    Ended,
}

/// A live recognition session handed out by a backend.
pub struct RecognizerSession {
    events: mpsc::Receiver<RecognizerEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl RecognizerSession {
    pub fn new(events: mpsc::Receiver<RecognizerEvent>, cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            events,
            cancel_tx: Some(cancel_tx),
        }
    }

    pub async fn recv(&mut self) -> Option<RecognizerEvent> {
        self.events.recv().await
    }

    /// Tear the session down. The backend stops emitting; no further event
    /// from this session is delivered. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for RecognizerSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Platform speech recognizer boundary.
#[async_trait]
pub trait SpeechRecognizer: Send {
    /// False on platforms without a recognition engine; `start()` becomes a
    /// warned no-op.
    fn is_supported(&self) -> bool {
        true
    }

    /// Open a recognition session. This is the one suspension point of the
    /// capture path: it may await a microphone permission decision and
    /// reject with [`CaptureError::PermissionDenied`].
    async fn begin_session(
        &mut self,
        config: &CaptureConfig,
    ) -> Result<RecognizerSession, CaptureError>;
}
