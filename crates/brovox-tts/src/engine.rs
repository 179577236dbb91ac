//! Synthesis backend abstraction and synthesis events

use crate::error::TtsResult;
use crate::types::VoiceInfo;

/// One unit of synthesized speech, cancellable as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub synthesis_id: u64,
    pub text: String,
    /// Resolved voice; `None` means the backend default.
    pub voice: Option<VoiceInfo>,
    pub pitch: f32,
    pub rate: f32,
    pub volume: f32,
}

/// Completion signals a backend reports for utterances handed to `begin`.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Finished { synthesis_id: u64 },
    Failed { synthesis_id: u64, error: String },
}

/// Synthesis lifecycle events forwarded to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEvent {
    /// Synthesis started for the given utterance
    Started { synthesis_id: u64 },
    /// Synthesis completed successfully
    Completed { synthesis_id: u64 },
    /// Synthesis failed with error
    Failed { synthesis_id: u64, error: String },
    /// Synthesis was preempted or stopped
    Cancelled { synthesis_id: u64 },
}

/// Platform synthesis boundary.
///
/// Implementations report completion on the event channel they were built
/// with, tagged by synthesis id; `SpeechOutput` discards stale ids, so a
/// backend that cannot suppress a late completion after `cancel` is still
/// safe.
pub trait SynthesisBackend: Send {
    /// Current voice inventory. The list may grow as platform voices finish
    /// loading; callers re-resolve per utterance.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Begin synthesizing. Must not block on playback; completion or
    /// failure arrives on the backend's event channel.
    fn begin(&mut self, utterance: Utterance) -> TtsResult<()>;

    /// Cancel the in-flight utterance, if any. Safe when idle.
    fn cancel(&mut self);
}

impl SynthesisBackend for Box<dyn SynthesisBackend> {
    fn voices(&self) -> Vec<VoiceInfo> {
        (**self).voices()
    }

    fn begin(&mut self, utterance: Utterance) -> TtsResult<()> {
        (**self).begin(utterance)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}
