//! Wake-phrase gate.
//!
//! Filters raw transcripts for an activation phrase while the assistant is
//! dormant. Matching is case-insensitive substring containment: recognizers
//! pad the phrase with noise ("um hey bro can you..."), so exact matching
//! would miss most real activations. The phrase sets are small; occasional
//! false positives on long unrelated utterances are the accepted cost.

use serde::{Deserialize, Serialize};

/// Assistant language preference, read once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hinglish,
}

impl Language {
    /// BCP 47 tag used to pick a synthesis voice for this preference.
    pub fn default_voice_tag(&self) -> &'static str {
        match self {
            Language::English => "en-US",
            Language::Hinglish => "hi-IN",
        }
    }
}

const ENGLISH_PHRASES: &[&str] = &["hey bro", "hello bro", "okay bro"];

// Hinglish sessions keep the English set and add romanized and Devanagari
// variants the recognizer produces for the same phrase.
const HINGLISH_PHRASES: &[&str] = &[
    "hey bro",
    "hello bro",
    "okay bro",
    "oye bro",
    "suno bro",
    "अरे ब्रो",
    "हे ब्रो",
];

/// A fixed set of activation phrases, stored lowercased.
#[derive(Debug, Clone)]
pub struct WakePhraseSet {
    phrases: Vec<String>,
}

impl WakePhraseSet {
    pub fn for_language(language: Language) -> Self {
        let table = match language {
            Language::English => ENGLISH_PHRASES,
            Language::Hinglish => HINGLISH_PHRASES,
        };
        Self {
            phrases: table.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Build a set from user-supplied phrases (lowercased on entry).
    pub fn custom(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// True when `transcript` contains any configured phrase, ignoring case.
    pub fn matches(&self, transcript: &str) -> bool {
        let lowered = transcript.to_lowercase();
        self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}
