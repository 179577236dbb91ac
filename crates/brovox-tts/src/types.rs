//! Core types for speech output

use serde::{Deserialize, Serialize};

/// User-configurable synthesis parameters, persisted externally and read
/// per utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Voice pitch (0.0-2.0, 1.0 is normal)
    pub pitch: f32,
    /// Speaking rate multiplier (0.5-2.0, 1.0 is normal)
    pub rate: f32,
    /// Volume (0.0-1.0)
    pub volume: f32,
    /// BCP 47 tag used for voice selection
    pub language_tag: String,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            rate: 1.0,
            volume: 1.0,
            language_tag: "en-US".to_string(),
        }
    }
}

impl VoiceProfile {
    /// Copy with every parameter forced into its documented range.
    pub fn clamped(&self) -> Self {
        Self {
            pitch: self.pitch.clamp(0.0, 2.0),
            rate: self.rate.clamp(0.5, 2.0),
            volume: self.volume.clamp(0.0, 1.0),
            language_tag: self.language_tag.clone(),
        }
    }
}

/// Voice information reported by a synthesis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Backend-specific voice identifier
    pub id: String,
    /// Human-readable voice name
    pub name: String,
    /// Locale code (e.g. "en-US", "hi-IN")
    pub language: String,
}
