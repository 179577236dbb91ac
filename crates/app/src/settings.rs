//! App settings: one small TOML file plus CLI overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use brovox_foundation::error::AppError;
use brovox_tts::VoiceProfile;
use brovox_wake::Language;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default language preference; a persisted store value overrides it.
    pub language: Language,
    pub voice: VoiceProfile,
    pub start_muted: bool,
    /// Capture restart backoff override, milliseconds.
    pub restart_backoff_ms: Option<u64>,
    pub user_id: String,
    /// Speak through espeak when the binary is built with that backend.
    pub espeak: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: Language::English,
            voice: VoiceProfile::default(),
            start_muted: false,
            restart_backoff_ms: None,
            user_id: "default".to_string(),
            espeak: true,
        }
    }
}

impl Settings {
    /// Load from `path` when it exists; defaults otherwise. A present but
    /// unparsable file is a configuration error, not a silent default.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw)
                .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e))),
            Err(_) => {
                debug!(target: "settings", "No settings file at {:?}, using defaults", path);
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/brovox.toml")).unwrap();
        assert_eq!(settings.language, Language::English);
        assert_eq!(settings.user_id, "default");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brovox.toml");
        std::fs::write(&path, "language = \"hinglish\"\nstart_muted = true\n").unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.language, Language::Hinglish);
        assert!(settings.start_muted);
        assert_eq!(settings.voice, VoiceProfile::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brovox.toml");
        std::fs::write(&path, "language = [broken").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(AppError::Config(_))
        ));
    }
}
