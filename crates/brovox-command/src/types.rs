//! Core types for command interpretation

use std::collections::HashSet;

/// A side-effect instruction produced by interpretation, distinct from the
/// spoken response text. Applied by the session controller, never here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ActivateFeature(String),
    DeactivateFeature(String),
    Mute,
    Unmute,
    /// Return the session to dormant after the response is spoken.
    Sleep,
}

/// One interpreted command: what to say and what to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub response_text: String,
    pub effects: Vec<Effect>,
}

impl CommandResult {
    pub fn spoken(response_text: impl Into<String>) -> Self {
        Self {
            response_text: response_text.into(),
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Set of currently active feature identifiers. Add and remove are
/// idempotent; activation of an already-active feature is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveFeatureSet {
    features: HashSet<String>,
}

impl ActiveFeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the feature was newly activated.
    pub fn activate(&mut self, id: &str) -> bool {
        self.features.insert(id.to_string())
    }

    /// Returns true when the feature was active before removal.
    pub fn deactivate(&mut self, id: &str) -> bool {
        self.features.remove(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.features.contains(id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
