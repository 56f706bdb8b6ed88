//! Whether external continue signals are processed.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_core::subsystem::StatefulSubsystem;

/// Snapshot key of the input gate.
pub const INPUT_ID: &str = "input";

/// Toggled by `@processInput`; the player ignores continue signals while
/// the gate is closed.
#[derive(Debug)]
pub struct InputGate {
    enabled: AtomicBool,
}

impl InputGate {
    /// Creates an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(true),
        }
    }

    /// Whether input is processed.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Opens or closes the gate.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for InputGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatefulSubsystem for InputGate {
    fn subsystem_id(&self) -> &str {
        INPUT_ID
    }

    fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.is_enabled())?)
    }

    async fn load_state(&self, state: &str) -> Result<(), EngineError> {
        self.set_enabled(serde_json::from_str(state)?);
        Ok(())
    }

    async fn reset_state(&self) {
        self.set_enabled(true);
    }
}
