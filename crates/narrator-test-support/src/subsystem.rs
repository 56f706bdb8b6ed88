//! A minimal stateful subsystem for snapshot tests.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_core::subsystem::StatefulSubsystem;

/// Holds a single integer, serialized as JSON.
#[derive(Debug)]
pub struct CounterSubsystem {
    id: String,
    value: AtomicI64,
}

impl CounterSubsystem {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: AtomicI64::new(0),
        }
    }

    /// Current value.
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Overwrites the value.
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Adds one.
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatefulSubsystem for CounterSubsystem {
    fn subsystem_id(&self) -> &str {
        &self.id
    }

    fn save_state(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string(&self.get())?)
    }

    async fn load_state(&self, state: &str) -> Result<(), EngineError> {
        let value: i64 = serde_json::from_str(state)?;
        self.set(value);
        Ok(())
    }

    async fn reset_state(&self) {
        self.set(0);
    }
}
