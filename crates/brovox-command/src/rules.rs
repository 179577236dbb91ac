//! The ordered rule table and `interpret`.

use std::sync::OnceLock;

use chrono::Local;

use crate::catalog::{self, FeatureEntry, FEATURES};
use crate::types::{ActiveFeatureSet, CommandResult, Effect};

const DEACTIVATION_VERBS: &[&str] = &["close", "stop", "turn off"];
const SLEEP_KEYWORDS: &[&str] = &["bye", "go to sleep", "sleep"];
const UNMUTE_KEYWORDS: &[&str] = &["unmute", "speak up", "voice on"];
const MUTE_KEYWORDS: &[&str] = &["mute", "be quiet", "silence"];

#[derive(Debug, Clone, Copy)]
enum RuleKind {
    Time,
    Date,
    Feature(&'static FeatureEntry),
    Sleep,
    // Unmute sits above Mute: "unmute" contains "mute" as a substring.
    Unmute,
    Mute,
    Fallback,
}

/// One (predicate, handler) pair of the interpreter cascade.
pub struct Rule {
    pub name: &'static str,
    kind: RuleKind,
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| input.contains(n))
}

impl Rule {
    /// `input` must already be trimmed and lowercased.
    pub fn matches(&self, input: &str) -> bool {
        match self.kind {
            RuleKind::Time => input.contains("time"),
            RuleKind::Date => input.contains("date") || input.contains("day"),
            RuleKind::Feature(entry) => contains_any(input, entry.keywords),
            RuleKind::Sleep => contains_any(input, SLEEP_KEYWORDS),
            RuleKind::Unmute => contains_any(input, UNMUTE_KEYWORDS),
            RuleKind::Mute => contains_any(input, MUTE_KEYWORDS),
            RuleKind::Fallback => true,
        }
    }

    pub fn apply(&self, raw: &str, input: &str, features: &ActiveFeatureSet) -> CommandResult {
        match self.kind {
            RuleKind::Time => {
                let now = Local::now();
                CommandResult::spoken(format!("It's {} right now, bro.", now.format("%-I:%M %p")))
            }
            RuleKind::Date => {
                let now = Local::now();
                CommandResult::spoken(format!("Today is {}.", now.format("%A, %B %-d, %Y")))
            }
            RuleKind::Feature(entry) => {
                if contains_any(input, DEACTIVATION_VERBS) {
                    let text = if features.is_active(entry.id) {
                        format!("Closing {}.", entry.spoken_name)
                    } else {
                        format!("Hmm, {} isn't open right now.", entry.spoken_name)
                    };
                    CommandResult::spoken(text)
                        .with_effect(Effect::DeactivateFeature(entry.id.to_string()))
                } else {
                    let text = if features.is_active(entry.id) {
                        format!("Looks like {} is already open, bro.", entry.spoken_name)
                    } else {
                        format!("Opening {}.", entry.spoken_name)
                    };
                    CommandResult::spoken(text)
                        .with_effect(Effect::ActivateFeature(entry.id.to_string()))
                }
            }
            RuleKind::Sleep => CommandResult::spoken(
                "Alright bro, going to sleep. Say the magic words when you need me.",
            )
            .with_effect(Effect::Sleep),
            RuleKind::Unmute => {
                CommandResult::spoken("Voice is back on, bro.").with_effect(Effect::Unmute)
            }
            RuleKind::Mute => {
                CommandResult::spoken("Muting my voice. I'll keep listening silently.")
                    .with_effect(Effect::Mute)
            }
            RuleKind::Fallback => CommandResult::spoken(format!(
                "I heard \"{}\", but I don't know that one yet. I can tell you the time or \
                 date, open {}, mute my voice, or go to sleep.",
                raw,
                catalog::capabilities_phrase(),
            )),
        }
    }
}

/// The cascade, in match order. Order is significant: time and date queries
/// outrank feature keywords, sleep outranks mute, fallback catches the rest.
pub fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let mut rules = vec![
            Rule {
                name: "time",
                kind: RuleKind::Time,
            },
            Rule {
                name: "date",
                kind: RuleKind::Date,
            },
        ];
        rules.extend(FEATURES.iter().map(|entry| Rule {
            name: entry.id,
            kind: RuleKind::Feature(entry),
        }));
        rules.push(Rule {
            name: "sleep",
            kind: RuleKind::Sleep,
        });
        rules.push(Rule {
            name: "unmute",
            kind: RuleKind::Unmute,
        });
        rules.push(Rule {
            name: "mute",
            kind: RuleKind::Mute,
        });
        rules.push(Rule {
            name: "fallback",
            kind: RuleKind::Fallback,
        });
        rules
    })
}

/// Classify one final transcript. Pure apart from the clock reads inside the
/// time and date handlers; identical input yields identical output otherwise.
pub fn interpret(transcript: &str, features: &ActiveFeatureSet) -> CommandResult {
    let raw = transcript.trim();
    let normalized = raw.to_lowercase();
    for rule in rules() {
        if rule.matches(&normalized) {
            return rule.apply(raw, &normalized, features);
        }
    }
    // The fallback rule matches everything.
    unreachable!("rule table must end with a catch-all")
}
