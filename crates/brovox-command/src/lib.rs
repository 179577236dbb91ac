//! Rule-based command interpreter.
//!
//! `interpret` is a pure function from a transcript and the current feature
//! set to a response plus side-effect instructions. Classification walks an
//! ordered rule table; the first matching rule wins, so rule order is part
//! of the contract (time/date before feature keywords, sleep before mute,
//! fallback last).

pub mod catalog;
pub mod rules;
pub mod types;

pub use catalog::{FeatureEntry, FEATURES};
pub use rules::{interpret, rules, Rule};
pub use types::{ActiveFeatureSet, CommandResult, Effect};
