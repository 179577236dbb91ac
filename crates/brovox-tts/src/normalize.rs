//! Utterance text normalization.
//!
//! Recognizer echoes and templated responses carry ellipsis runs and spaced
//! punctuation that synthesis engines read out with awkward pauses. The
//! normalizer collapses them before the text reaches a backend.

use std::sync::OnceLock;

use regex::Regex;

fn dots() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.{2,}").expect("dots pattern"))
}

fn space_before_punct() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+([.,!?;:])").expect("punct pattern"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern"))
}

pub fn normalize_text(text: &str) -> String {
    let collapsed = dots().replace_all(text, ".");
    let tightened = space_before_punct().replace_all(&collapsed, "$1");
    whitespace_runs()
        .replace_all(&tightened, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipsis_runs_collapse_to_one_period() {
        assert_eq!(normalize_text("Opening email..."), "Opening email.");
        assert_eq!(normalize_text("well..... okay"), "well. okay");
    }

    #[test]
    fn space_before_punctuation_is_removed() {
        assert_eq!(normalize_text("hello , bro !"), "hello, bro!");
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(normalize_text("  too   many\t spaces  "), "too many spaces");
    }

    #[test]
    fn clean_text_is_untouched() {
        assert_eq!(normalize_text("It's 3:04 PM."), "It's 3:04 PM.");
    }
}
