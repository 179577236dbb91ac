//! Speech capture abstraction layer for BroVox
//!
//! This crate provides the recognizer backend trait, transcript event types,
//! and the capture supervisor that keeps continuous recognition alive across
//! the platform's unpredictable session terminations.

pub mod backends;
pub mod capture;
pub mod recognizer;
pub mod types;

pub use capture::{CaptureHandle, CaptureState, CaptureSupervisor};
pub use recognizer::{RecognizerEvent, RecognizerSession, SpeechRecognizer};
pub use types::{CaptureConfig, CaptureEvent, RecognitionErrorCode, TranscriptEvent};
