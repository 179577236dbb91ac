//! Deterministic voice selection.
//!
//! Preference order per utterance: known high-quality named voices for the
//! requested language, then the first voice whose locale shares the language
//! prefix, then the backend default (`None`). Selection re-runs against the
//! backend's current list on every call, so voices that load late are
//! picked up without a restart.

use crate::types::VoiceInfo;

/// Known good platform voices, checked in order per language prefix.
const PREFERRED_VOICES: &[(&str, &[&str])] = &[
    ("en", &["Google US English", "Samantha", "Microsoft Zira"]),
    ("hi", &["Google हिन्दी", "Lekha"]),
];

pub fn select_voice(voices: &[VoiceInfo], language_tag: &str) -> Option<VoiceInfo> {
    let prefix = language_tag
        .split('-')
        .next()
        .unwrap_or(language_tag)
        .to_lowercase();

    if let Some((_, names)) = PREFERRED_VOICES.iter().find(|(p, _)| *p == prefix) {
        for name in names.iter() {
            if let Some(voice) = voices.iter().find(|v| v.name == *name) {
                return Some(voice.clone());
            }
        }
    }

    voices
        .iter()
        .find(|v| v.language.to_lowercase().starts_with(&prefix))
        .cloned()
}
