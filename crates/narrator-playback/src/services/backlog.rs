//! Record of printed messages.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_core::spot::PlaybackSpot;
use narrator_core::subsystem::StatefulSubsystem;
use serde::{Deserialize, Serialize};

/// Snapshot key of the backlog.
pub const BACKLOG_ID: &str = "backlog";

/// Oldest messages are dropped beyond this many.
pub const MAX_BACKLOG_MESSAGES: usize = 300;

/// One printed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogMessage {
    /// Speaking character, if any.
    pub author: Option<String>,
    /// Printed text after variable substitution.
    pub text: String,
    /// Command that printed it.
    pub spot: PlaybackSpot,
}

/// Printed messages in order.
#[derive(Debug, Default)]
pub struct Backlog {
    messages: Mutex<Vec<BacklogMessage>>,
}

impl Backlog {
    /// Creates an empty backlog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn push(&self, message: BacklogMessage) {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages.push(message);
        if messages.len() > MAX_BACKLOG_MESSAGES {
            let excess = messages.len() - MAX_BACKLOG_MESSAGES;
            messages.drain(..excess);
        }
    }

    /// Copy of every message.
    #[must_use]
    pub fn messages(&self) -> Vec<BacklogMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes every message.
    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl StatefulSubsystem for Backlog {
    fn subsystem_id(&self) -> &str {
        BACKLOG_ID
    }

    fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.messages())?)
    }

    async fn load_state(&self, state: &str) -> Result<(), EngineError> {
        let messages: Vec<BacklogMessage> = serde_json::from_str(state)?;
        *self.messages.lock().unwrap_or_else(PoisonError::into_inner) = messages;
        Ok(())
    }

    async fn reset_state(&self) {
        self.clear();
    }
}
