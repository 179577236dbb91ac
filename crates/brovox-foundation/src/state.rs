use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle of one assistant session.
///
/// Exactly one value at a time, owned by the session controller. Everyone
/// else observes through [`SessionStateCell::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Capture running, only wake-phrase matches are actionable.
    Dormant,
    /// Capture running, transcripts routed to the command interpreter.
    Awake,
    /// A final transcript is being interpreted.
    Processing,
    /// An utterance is in flight; incoming transcripts are dropped so the
    /// assistant does not transcribe its own voice.
    Speaking,
}

pub struct SessionStateCell {
    state: Arc<RwLock<SessionState>>,
    state_tx: Sender<SessionState>,
    state_rx: Receiver<SessionState>,
}

impl Default for SessionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateCell {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(SessionState::Dormant)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: SessionState) -> Result<(), AppError> {
        let mut current = self.state.write();

        // Dormant -> Awake covers a wake while muted (no greeting spoken);
        // Processing -> Dormant covers a muted sleep command.
        let valid = matches!(
            (&*current, &new_state),
            (SessionState::Dormant, SessionState::Speaking)
                | (SessionState::Dormant, SessionState::Awake)
                | (SessionState::Awake, SessionState::Processing)
                | (SessionState::Awake, SessionState::Dormant)
                | (SessionState::Processing, SessionState::Speaking)
                | (SessionState::Processing, SessionState::Awake)
                | (SessionState::Processing, SessionState::Dormant)
                | (SessionState::Speaking, SessionState::Awake)
                | (SessionState::Speaking, SessionState::Dormant)
        );

        if !valid {
            return Err(AppError::Fatal(format!(
                "Invalid session transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::debug!(target: "session", "State transition: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<SessionState> {
        self.state_rx.clone()
    }
}
