//! Collaborator ports.
//!
//! The session controller drives these boundaries fire-and-forget; nothing
//! behind them feeds back into the state machine.

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Error,
}

/// User-visible toast/notification surface.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str, kind: NotifyKind);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatSender {
    User,
    Assistant,
}

impl ChatSender {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatSender::User => "user",
            ChatSender::Assistant => "assistant",
        }
    }
}

/// Keyed memory plus chat log.
pub trait MemoryStore: Send + Sync {
    fn get(&self, user_id: &str, key: &str) -> Option<String>;
    fn set(&self, user_id: &str, key: &str, value: &str);
    fn append_message(&self, user_id: &str, text: &str, sender: ChatSender);
}

/// Opens a website/app in a new context; no success confirmation.
pub trait FeatureLauncher: Send + Sync {
    fn open_external(&self, url: &str);
}

/// Notification sink that writes to the log stream.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, title: &str, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Info => info!(target: "notify", "{}: {}", title, message),
            NotifyKind::Error => error!(target: "notify", "{}: {}", title, message),
        }
    }
}

/// Launcher backed by `xdg-open`. Spawn-and-forget; failures only log.
pub struct XdgOpenLauncher;

impl FeatureLauncher for XdgOpenLauncher {
    fn open_external(&self, url: &str) {
        match tokio::process::Command::new("xdg-open").arg(url).spawn() {
            Ok(_) => info!(target: "launcher", "Opening {}", url),
            Err(e) => error!(target: "launcher", "Failed to open {}: {}", url, e),
        }
    }
}
