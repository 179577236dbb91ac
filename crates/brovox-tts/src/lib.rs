//! Speech output abstraction layer for BroVox
//!
//! This crate provides the synthesis backend trait, utterance and voice
//! types, deterministic voice selection, and the preempting `SpeechOutput`
//! task that guarantees at most one utterance is ever in flight.

use std::sync::atomic::{AtomicU64, Ordering};

pub mod backends;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod output;
pub mod types;
pub mod voice;

pub use engine::{BackendEvent, SynthesisBackend, SynthesisEvent, Utterance};
pub use error::{TtsError, TtsResult};
pub use normalize::normalize_text;
pub use output::{OutputCommand, OutputHandle, SpeechOutput};
pub use types::{VoiceInfo, VoiceProfile};
pub use voice::select_voice;

/// Generates unique synthesis IDs
static SYNTHESIS_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique synthesis ID
pub fn next_synthesis_id() -> u64 {
    SYNTHESIS_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}
