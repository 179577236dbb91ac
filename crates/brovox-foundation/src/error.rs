use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Capture subsystem error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Transient error, will retry: {0}")]
    Transient(String),
}

/// Terminal failures of the speech capture loop.
///
/// Anything transient (silence timeouts, `no-speech` results) is absorbed
/// inside the capture supervisor and never reaches this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Recognition service network failure")]
    Network,

    #[error("Speech recognition not supported on this platform")]
    Unsupported,

    #[error("Recognizer failure: {code}")]
    Recognizer { code: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Restart the recognizer after the capture backoff.
    Restart,
    /// Keep listening, nothing to do.
    Ignore,
    /// Stop the capture loop and surface the error to the user.
    Fatal,
}

impl CaptureError {
    /// Permission and network failures require explicit user action to
    /// recover; auto-restarting them would loop against a denied prompt.
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            CaptureError::PermissionDenied
            | CaptureError::Network
            | CaptureError::Unsupported => RecoveryStrategy::Fatal,
            CaptureError::Recognizer { .. } => RecoveryStrategy::Restart,
        }
    }

    pub fn is_user_actionable(&self) -> bool {
        matches!(self.recovery_strategy(), RecoveryStrategy::Fatal)
    }
}
