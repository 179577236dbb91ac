//! Runtime wiring: builds the pipeline from settings and hands back a
//! handle that owns every task.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use brovox_foundation::clock::RealClock;
use brovox_foundation::error::AppError;
use brovox_foundation::state::SessionState;
use brovox_stt::{CaptureConfig, CaptureSupervisor};
use brovox_telemetry::PipelineMetrics;
use brovox_tts::backends::NullBackend;
use brovox_tts::{BackendEvent, SpeechOutput, SynthesisBackend, VoiceProfile};
use brovox_wake::Language;

use crate::ports::{LogNotifier, MemoryStore, XdgOpenLauncher};
use crate::session::{SessionController, SessionHandle, SessionOptions};
use crate::settings::Settings;
use crate::stdin_input::StdinRecognizer;
use crate::store::JsonFileStore;

const BACKEND_CHANNEL_SIZE: usize = 32;

/// Handle to the running pipeline
pub struct AppHandle {
    pub metrics: Arc<PipelineMetrics>,
    session: SessionHandle,
    state_rx: crossbeam_channel::Receiver<SessionState>,
    session_handle: JoinHandle<()>,
    capture_handle: JoinHandle<()>,
    output_handle: JoinHandle<()>,
}

impl AppHandle {
    /// Subscribe to session state transitions (UI, diagnostics).
    pub fn subscribe_state(&self) -> crossbeam_channel::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Gracefully stop the pipeline and wait for shutdown
    pub async fn shutdown(self) {
        info!("Shutting down BroVox runtime...");
        self.session.shutdown().await;
        let _ = self.session_handle.await;

        // The session dropped its capture and output handles; the worker
        // loops exit once the remaining handles go away.
        self.capture_handle.abort();
        self.output_handle.abort();
        let _ = self.capture_handle.await;
        let _ = self.output_handle.await;
        info!("BroVox runtime shutdown complete");
    }

    /// Wait for shutdown signal (Ctrl+C)
    pub async fn wait_for_shutdown_signal() {
        info!("Waiting for shutdown signal (Ctrl+C)...");
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, initiating graceful shutdown"),
            Err(err) => error!("Failed to listen for SIGINT: {}", err),
        }
    }
}

fn persisted_language(store: &dyn MemoryStore, user_id: &str, fallback: Language) -> Language {
    match store.get(user_id, "language").as_deref() {
        Some("english") => Language::English,
        Some("hinglish") => Language::Hinglish,
        Some(other) => {
            warn!(target: "settings", "Unknown persisted language {:?}, keeping default", other);
            fallback
        }
        None => fallback,
    }
}

fn persisted_voice(store: &dyn MemoryStore, user_id: &str) -> Option<VoiceProfile> {
    let raw = store.get(user_id, "voice_profile")?;
    match serde_json::from_str(&raw) {
        Ok(profile) => Some(profile),
        Err(e) => {
            warn!(target: "settings", "Bad persisted voice profile ({}), keeping default", e);
            None
        }
    }
}

async fn build_synthesis_backend(
    settings: &Settings,
    backend_tx: mpsc::Sender<BackendEvent>,
) -> Box<dyn SynthesisBackend> {
    #[cfg(feature = "espeak")]
    if settings.espeak {
        match brovox_tts_espeak::EspeakBackend::probe(backend_tx.clone()).await {
            Ok(backend) => return Box::new(backend),
            Err(e) => warn!(target: "tts", "espeak unavailable ({}), responses will be logged only", e),
        }
    }
    #[cfg(not(feature = "espeak"))]
    if settings.espeak {
        warn!(target: "tts", "Built without the espeak feature, responses will be logged only");
    }
    Box::new(NullBackend::new(backend_tx))
}

/// Start the BroVox pipeline with the given settings
pub async fn start(settings: Settings) -> Result<AppHandle, AppError> {
    // Metrics shared across components
    let metrics = Arc::new(PipelineMetrics::default());

    // Collaborators
    let store = Arc::new(JsonFileStore::open(JsonFileStore::default_path()));
    let notifier = Arc::new(LogNotifier);
    let launcher = Arc::new(XdgOpenLauncher);

    // Language preference and voice profile are read once, at startup.
    let language = persisted_language(store.as_ref(), &settings.user_id, settings.language);
    let voice_profile = persisted_voice(store.as_ref(), &settings.user_id).unwrap_or_else(|| {
        let mut profile = settings.voice.clone();
        // An untouched default profile follows the language preference.
        if profile == VoiceProfile::default() {
            profile.language_tag = language.default_voice_tag().to_string();
        }
        profile
    });

    // 1) Speech capture
    let mut capture_config = CaptureConfig {
        language_tag: voice_profile.language_tag.clone(),
        ..Default::default()
    };
    if let Some(ms) = settings.restart_backoff_ms {
        capture_config.restart_backoff = Duration::from_millis(ms);
    }
    let (capture, capture_rx, capture_handle) = CaptureSupervisor::spawn(
        StdinRecognizer,
        capture_config,
        Arc::new(RealClock::new()),
        metrics.clone(),
    );

    // 2) Speech output
    let (backend_tx, backend_rx) = mpsc::channel(BACKEND_CHANNEL_SIZE);
    let backend = build_synthesis_backend(&settings, backend_tx).await;
    let (output, synthesis_rx, output_handle) =
        SpeechOutput::spawn(backend, backend_rx, metrics.clone());

    // 3) Session controller
    let options = SessionOptions {
        language,
        voice_profile,
        start_muted: settings.start_muted,
        user_id: settings.user_id.clone(),
    };
    let (controller, session) = SessionController::new(
        options,
        capture,
        capture_rx,
        output,
        synthesis_rx,
        notifier,
        store,
        launcher,
        metrics.clone(),
    );
    let state_rx = controller.state_cell().subscribe();
    let session_handle = tokio::spawn(controller.run());

    info!(
        "BroVox pipeline started (language: {:?}, espeak: {})",
        language, settings.espeak
    );

    Ok(AppHandle {
        metrics,
        session,
        state_rx,
        session_handle,
        capture_handle,
        output_handle,
    })
}
