//! JSON file implementation of the memory store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::ports::{ChatSender, MemoryStore};

#[derive(Debug, Serialize, Deserialize)]
struct ChatEntry {
    user_id: String,
    sender: String,
    text: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    /// user_id -> key -> value
    values: HashMap<String, HashMap<String, String>>,
    chat_log: Vec<ChatEntry>,
}

/// Keyed memory and chat log persisted as one JSON file. Writes are
/// fire-and-forget: persistence failures log and the in-memory state
/// carries the session.
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(target: "store", "Corrupt store at {:?} ({}), starting fresh", path, e);
                StoreState::default()
            }),
            Err(_) => StoreState::default(),
        };
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("brovox")
            .join("memory.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &StoreState) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!(target: "store", "Cannot create {:?}: {}", parent, e);
                return;
            }
        }
        match serde_json::to_string_pretty(state) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    error!(target: "store", "Cannot write {:?}: {}", self.path, e);
                }
            }
            Err(e) => error!(target: "store", "Cannot serialize store: {}", e),
        }
    }
}

impl MemoryStore for JsonFileStore {
    fn get(&self, user_id: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .values
            .get(user_id)
            .and_then(|m| m.get(key))
            .cloned()
    }

    fn set(&self, user_id: &str, key: &str, value: &str) {
        let mut state = self.state.lock();
        state
            .values
            .entry(user_id.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.persist(&state);
    }

    fn append_message(&self, user_id: &str, text: &str, sender: ChatSender) {
        debug!(target: "store", "[{}] {}: {}", user_id, sender.as_str(), text);
        let mut state = self.state.lock();
        state.chat_log.push(ChatEntry {
            user_id: user_id.to_string(),
            sender: sender.as_str().to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        self.persist(&state);
    }
}
