use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared metrics for cross-task pipeline monitoring
#[derive(Clone)]
pub struct PipelineMetrics {
    // Capture
    pub transcripts_partial: Arc<AtomicU64>,
    pub transcripts_final: Arc<AtomicU64>,
    pub transcripts_suppressed: Arc<AtomicU64>, // dropped while speaking
    pub capture_restarts: Arc<AtomicU64>,
    pub capture_errors: Arc<AtomicU64>,

    // Session
    pub wake_matches: Arc<AtomicU64>,
    pub commands_interpreted: Arc<AtomicU64>,
    pub interpreter_defects: Arc<AtomicU64>,

    // Synthesis
    pub utterances_started: Arc<AtomicU64>,
    pub utterances_completed: Arc<AtomicU64>,
    pub utterances_preempted: Arc<AtomicU64>,
    pub synthesis_errors: Arc<AtomicU64>,

    // Activity indicators
    pub is_speaking: Arc<AtomicBool>,
    pub last_final_transcript: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            transcripts_partial: Arc::new(AtomicU64::new(0)),
            transcripts_final: Arc::new(AtomicU64::new(0)),
            transcripts_suppressed: Arc::new(AtomicU64::new(0)),
            capture_restarts: Arc::new(AtomicU64::new(0)),
            capture_errors: Arc::new(AtomicU64::new(0)),
            wake_matches: Arc::new(AtomicU64::new(0)),
            commands_interpreted: Arc::new(AtomicU64::new(0)),
            interpreter_defects: Arc::new(AtomicU64::new(0)),
            utterances_started: Arc::new(AtomicU64::new(0)),
            utterances_completed: Arc::new(AtomicU64::new(0)),
            utterances_preempted: Arc::new(AtomicU64::new(0)),
            synthesis_errors: Arc::new(AtomicU64::new(0)),
            is_speaking: Arc::new(AtomicBool::new(false)),
            last_final_transcript: Arc::new(RwLock::new(None)),
        }
    }
}

impl PipelineMetrics {
    pub fn mark_final_transcript(&self) {
        self.transcripts_final.fetch_add(1, Ordering::Relaxed);
        *self.last_final_transcript.write() = Some(Instant::now());
    }

    /// One-line summary for the shutdown log.
    pub fn log_summary(&self) {
        tracing::info!(
            target: "telemetry",
            "Session stats - transcripts: {} final / {} partial ({} suppressed), \
             restarts: {}, wake matches: {}, commands: {}, utterances: {} spoken / {} preempted, \
             capture errors: {}, synthesis errors: {}",
            self.transcripts_final.load(Ordering::Relaxed),
            self.transcripts_partial.load(Ordering::Relaxed),
            self.transcripts_suppressed.load(Ordering::Relaxed),
            self.capture_restarts.load(Ordering::Relaxed),
            self.wake_matches.load(Ordering::Relaxed),
            self.commands_interpreted.load(Ordering::Relaxed),
            self.utterances_completed.load(Ordering::Relaxed),
            self.utterances_preempted.load(Ordering::Relaxed),
            self.capture_errors.load(Ordering::Relaxed),
            self.synthesis_errors.load(Ordering::Relaxed),
        );
    }
}
