//! Typed-transcript recognizer.
//!
//! Reads lines from stdin and emits each as a final transcript, so the
//! assistant is drivable from a terminal without a microphone. One line is
//! one recognizer result.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

use brovox_foundation::error::CaptureError;
use brovox_stt::{CaptureConfig, RecognizerEvent, RecognizerSession, SpeechRecognizer, TranscriptEvent};

const SESSION_CHANNEL_SIZE: usize = 32;

pub struct StdinRecognizer;

#[async_trait]
impl SpeechRecognizer for StdinRecognizer {
    async fn begin_session(
        &mut self,
        _config: &CaptureConfig,
    ) -> Result<RecognizerSession, CaptureError> {
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_SIZE);
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => return,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            let event = RecognizerEvent::Result(
                                TranscriptEvent::final_text(line, 1.0),
                            );
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        // Closed stdin is not a session end worth restarting
                        // against; stay open and silent until cancelled.
                        Ok(None) | Err(_) => {
                            let _ = cancel_rx.await;
                            return;
                        }
                    }
                }
            }
        });

        Ok(RecognizerSession::new(rx, cancel_tx))
    }
}
