//! Synthesis backends that need no platform engine.
//!
//! `MockBackend` records utterances and lets tests drive completion by
//! hand, including out-of-order and stale completions.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::{BackendEvent, SynthesisBackend, Utterance};
use crate::error::{TtsError, TtsResult};
use crate::types::VoiceInfo;

#[derive(Default)]
struct MockShared {
    begun: Vec<Utterance>,
    active: Option<u64>,
    fail_next: Option<String>,
    voices: Vec<VoiceInfo>,
}

/// Test control for a [`MockBackend`] owned by the output task.
#[derive(Clone)]
pub struct MockBackendHandle {
    shared: Arc<Mutex<MockShared>>,
    event_tx: mpsc::Sender<BackendEvent>,
}

impl MockBackendHandle {
    /// Report the active utterance as finished. No-op when idle or already
    /// cancelled.
    pub fn finish_current(&self) {
        let id = self.shared.lock().active.take();
        if let Some(synthesis_id) = id {
            let _ = self.event_tx.try_send(BackendEvent::Finished { synthesis_id });
        }
    }

    pub fn fail_current(&self, error: impl Into<String>) {
        let id = self.shared.lock().active.take();
        if let Some(synthesis_id) = id {
            let _ = self.event_tx.try_send(BackendEvent::Failed {
                synthesis_id,
                error: error.into(),
            });
        }
    }

    /// Inject a raw completion event, active or not. Models a platform
    /// that reports late completions for cancelled utterances.
    pub fn report_finished(&self, synthesis_id: u64) {
        let _ = self.event_tx.try_send(BackendEvent::Finished { synthesis_id });
    }

    /// Make the next `begin` call fail with a synthesis error.
    pub fn fail_next_begin(&self, error: impl Into<String>) {
        self.shared.lock().fail_next = Some(error.into());
    }

    /// Voices can be added while the backend is live, modeling platforms
    /// whose voice list loads asynchronously.
    pub fn add_voice(&self, voice: VoiceInfo) {
        self.shared.lock().voices.push(voice);
    }

    pub fn begun_texts(&self) -> Vec<String> {
        self.shared.lock().begun.iter().map(|u| u.text.clone()).collect()
    }

    pub fn begun(&self) -> Vec<Utterance> {
        self.shared.lock().begun.clone()
    }

    pub fn active_id(&self) -> Option<u64> {
        self.shared.lock().active
    }
}

/// In-memory synthesis backend for tests and headless runs.
pub struct MockBackend {
    shared: Arc<Mutex<MockShared>>,
    event_tx: mpsc::Sender<BackendEvent>,
}

impl MockBackend {
    pub fn new(event_tx: mpsc::Sender<BackendEvent>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(MockShared::default())),
            event_tx,
        }
    }

    pub fn with_voices(event_tx: mpsc::Sender<BackendEvent>, voices: Vec<VoiceInfo>) -> Self {
        let backend = Self::new(event_tx);
        backend.shared.lock().voices = voices;
        backend
    }

    pub fn handle(&self) -> MockBackendHandle {
        MockBackendHandle {
            shared: self.shared.clone(),
            event_tx: self.event_tx.clone(),
        }
    }
}

/// Backend for platforms without a synthesis engine: logs each utterance
/// and reports it finished immediately, so the session never waits on
/// audio that cannot play.
pub struct NullBackend {
    event_tx: mpsc::Sender<BackendEvent>,
}

impl NullBackend {
    pub fn new(event_tx: mpsc::Sender<BackendEvent>) -> Self {
        Self { event_tx }
    }
}

impl SynthesisBackend for NullBackend {
    fn voices(&self) -> Vec<VoiceInfo> {
        Vec::new()
    }

    fn begin(&mut self, utterance: Utterance) -> TtsResult<()> {
        tracing::info!(target: "tts", "[voice] {}", utterance.text);
        let _ = self.event_tx.try_send(BackendEvent::Finished {
            synthesis_id: utterance.synthesis_id,
        });
        Ok(())
    }

    fn cancel(&mut self) {}
}

impl SynthesisBackend for MockBackend {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.shared.lock().voices.clone()
    }

    fn begin(&mut self, utterance: Utterance) -> TtsResult<()> {
        let mut shared = self.shared.lock();
        if let Some(error) = shared.fail_next.take() {
            return Err(TtsError::SynthesisError(error));
        }
        debug!(target: "tts", "Mock backend speaking: {}", utterance.text);
        shared.active = Some(utterance.synthesis_id);
        shared.begun.push(utterance);
        Ok(())
    }

    fn cancel(&mut self) {
        self.shared.lock().active = None;
    }
}
