//! Error types for speech output

use thiserror::Error;

/// TTS error types
#[derive(Error, Debug)]
pub enum TtsError {
    /// Engine is not available or not installed
    #[error("TTS engine not available: {0}")]
    EngineNotAvailable(String),

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisError(String),

    /// IO error (process spawning, pipe writes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for TTS operations
pub type TtsResult<T> = Result<T, TtsError>;
