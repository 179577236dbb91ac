//! eSpeak synthesis backend for BroVox
//!
//! Drives the `espeak` (or `espeak-ng`) command through `tokio::process`.
//! `begin` spawns the process and returns immediately; a watcher task
//! reports completion on the backend event channel, and `cancel` kills the
//! child so a stopped utterance falls silent at once.

use std::sync::OnceLock;

use regex::Regex;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use brovox_tts::{BackendEvent, SynthesisBackend, TtsError, TtsResult, Utterance, VoiceInfo};

fn voice_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // espeak voice list format: Pty Language Age/Gender VoiceName File Other
    RE.get_or_init(|| {
        Regex::new(r"^\s*\d+\s+([\w-]+)\s+[MF+\s-]*\s([\w/\-_]+)\s").expect("voice pattern")
    })
}

async fn resolve_command() -> Option<&'static str> {
    for cmd in ["espeak", "espeak-ng"] {
        if Command::new(cmd).arg("--version").output().await.is_ok() {
            return Some(cmd);
        }
    }
    None
}

fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
    let mut voices = Vec::new();
    for line in output.lines().skip(1) {
        if let Some(captures) = voice_line().captures(line) {
            let language = captures.get(1).map_or("unknown", |m| m.as_str()).to_string();
            let id = captures.get(2).map_or("unknown", |m| m.as_str()).to_string();
            voices.push(VoiceInfo {
                name: format!("{} ({})", language, id),
                id,
                language,
            });
        }
    }
    voices
}

pub struct EspeakBackend {
    command: &'static str,
    event_tx: mpsc::Sender<BackendEvent>,
    voices: Vec<VoiceInfo>,
    current: Option<(u64, oneshot::Sender<()>)>,
}

impl EspeakBackend {
    /// Probe for an espeak binary and its voice inventory.
    pub async fn probe(event_tx: mpsc::Sender<BackendEvent>) -> TtsResult<Self> {
        let command = resolve_command().await.ok_or_else(|| {
            TtsError::EngineNotAvailable("espeak / espeak-ng not found on PATH".into())
        })?;

        let voices = match Command::new(command).arg("--voices").output().await {
            Ok(out) => parse_voice_list(&String::from_utf8_lossy(&out.stdout)),
            Err(err) => {
                warn!(target: "tts", "Could not list espeak voices: {}", err);
                Vec::new()
            }
        };
        debug!(target: "tts", "espeak backend ready ({} voices via {})", voices.len(), command);

        Ok(Self {
            command,
            event_tx,
            voices,
            current: None,
        })
    }

    fn build_args(&self, utterance: &Utterance) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(voice) = &utterance.voice {
            args.push("-v".to_string());
            args.push(voice.id.clone());
        }
        // espeak speaks in words per minute; 175 wpm is its normal rate.
        args.push("-s".to_string());
        args.push(((175.0 * utterance.rate) as u32).to_string());
        // Pitch 0-99, 50 is normal.
        args.push("-p".to_string());
        args.push(((utterance.pitch * 50.0).clamp(0.0, 99.0) as u32).to_string());
        // Amplitude 0-200, 100 is normal.
        args.push("-a".to_string());
        args.push(((utterance.volume * 100.0).clamp(0.0, 200.0) as u32).to_string());
        args.push(utterance.text.clone());
        args
    }
}

impl SynthesisBackend for EspeakBackend {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn begin(&mut self, utterance: Utterance) -> TtsResult<()> {
        let synthesis_id = utterance.synthesis_id;
        let mut child = Command::new(self.command)
            .args(self.build_args(&utterance))
            .spawn()
            .map_err(|e| TtsError::SynthesisError(format!("spawn espeak: {e}")))?;

        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = &mut cancel_rx => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
                status = child.wait() => {
                    let event = match status {
                        Ok(s) if s.success() => BackendEvent::Finished { synthesis_id },
                        Ok(s) => BackendEvent::Failed {
                            synthesis_id,
                            error: format!("espeak exited with {s}"),
                        },
                        Err(e) => BackendEvent::Failed {
                            synthesis_id,
                            error: e.to_string(),
                        },
                    };
                    let _ = event_tx.send(event).await;
                }
            }
        });

        self.current = Some((synthesis_id, cancel_tx));
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some((synthesis_id, cancel_tx)) = self.current.take() {
            debug!(target: "tts", "Killing espeak for utterance {}", synthesis_id);
            let _ = cancel_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_list_parsing_extracts_language_and_id() {
        let output = "\
Pty Language Age/Gender VoiceName          File          Other Languages
 5  af             M  afrikaans            other/af
 5  en             M  default              default
 2  en-gb          M  english              en
";
        let voices = parse_voice_list(output);
        assert!(voices.iter().any(|v| v.language == "en"));
        assert!(voices.iter().any(|v| v.language == "en-gb"));
    }

    #[test]
    fn args_scale_profile_into_espeak_units() {
        let (tx, _rx) = mpsc::channel(1);
        let backend = EspeakBackend {
            command: "espeak",
            event_tx: tx,
            voices: Vec::new(),
            current: None,
        };
        let utterance = Utterance {
            synthesis_id: 1,
            text: "hello".into(),
            voice: None,
            pitch: 1.0,
            rate: 2.0,
            volume: 0.5,
        };
        let args = backend.build_args(&utterance);
        let joined = args.join(" ");
        assert!(joined.contains("-s 350"));
        assert!(joined.contains("-p 50"));
        assert!(joined.contains("-a 50"));
        assert!(args.last().unwrap() == "hello");
    }
}
