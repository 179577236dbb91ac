//! Static feature catalog.
//!
//! Maps feature identifiers to trigger keywords and the URL the launcher
//! opens for them. The interpreter matches keywords; the session controller
//! resolves identifiers back through [`lookup`] when applying effects.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureEntry {
    pub id: &'static str,
    /// Name used in spoken responses ("Opening email.").
    pub spoken_name: &'static str,
    /// Transcript substrings that select this feature.
    pub keywords: &'static [&'static str],
    pub url: &'static str,
}

pub const FEATURES: &[FeatureEntry] = &[
    FeatureEntry {
        id: "email",
        spoken_name: "email",
        keywords: &["email", "mail", "inbox"],
        url: "https://mail.google.com",
    },
    FeatureEntry {
        id: "youtube",
        spoken_name: "YouTube",
        keywords: &["youtube", "video"],
        url: "https://www.youtube.com",
    },
    FeatureEntry {
        id: "news",
        spoken_name: "the news",
        keywords: &["news", "headlines"],
        url: "https://news.google.com",
    },
    FeatureEntry {
        id: "music",
        spoken_name: "music",
        keywords: &["music", "song", "spotify"],
        url: "https://open.spotify.com",
    },
    FeatureEntry {
        id: "maps",
        spoken_name: "maps",
        keywords: &["maps", "directions"],
        url: "https://maps.google.com",
    },
];

pub fn lookup(id: &str) -> Option<&'static FeatureEntry> {
    FEATURES.iter().find(|f| f.id == id)
}

/// Spoken list of launchable features, for the fallback response.
pub fn capabilities_phrase() -> String {
    let names: Vec<&str> = FEATURES.iter().map(|f| f.spoken_name).collect();
    match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => {
            format!("{} or {}", rest.join(", "), last)
        }
        Some((last, _)) => (*last).to_string(),
        None => String::new(),
    }
}
