//! Core types for speech capture

use std::time::Duration;

use brovox_foundation::error::CaptureError;

/// One recognizer result. Interim results exist for live-transcript UI only;
/// only final results drive the session state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
    /// Recognizer confidence, 0.0-1.0.
    pub confidence: f32,
}

impl TranscriptEvent {
    pub fn final_text(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
        }
    }

    pub fn interim(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence,
        }
    }
}

/// Raw error codes surfaced by recognizer backends (Web Speech naming).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    NoSpeech,
    Aborted,
    AudioCapture,
    NotAllowed,
    Network,
    Other(String),
}

/// What the supervisor should do with a recognizer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Absorb and keep listening; not a termination.
    Transient,
    /// Stop the capture loop and surface to the user.
    Terminal(CaptureError),
}

impl RecognitionErrorCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        }
    }

    /// Permission and network failures are not transient; retrying them
    /// loops against a denied prompt or a dead service.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotAllowed => ErrorSeverity::Terminal(CaptureError::PermissionDenied),
            Self::Network => ErrorSeverity::Terminal(CaptureError::Network),
            Self::NoSpeech | Self::Aborted | Self::AudioCapture | Self::Other(_) => {
                ErrorSeverity::Transient
            }
        }
    }
}

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// BCP 47 tag passed to the recognizer.
    pub language_tag: String,
    /// Forward interim results on the capture channel.
    pub interim_results: bool,
    /// Delay before reopening the recognizer after an unsolicited end.
    pub restart_backoff: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".to_string(),
            interim_results: true,
            restart_backoff: Duration::from_millis(100),
        }
    }
}

/// Events the capture supervisor emits downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    Transcript(TranscriptEvent),
    /// Terminal failure; the supervisor has already stopped listening.
    Failed(CaptureError),
}
