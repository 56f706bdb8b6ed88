//! Test slot stores: mock `SaveSlotStore` implementations for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use narrator_core::error::EngineError;
use narrator_core::repository::SaveSlotStore;
use narrator_core::snapshot::GameSave;

/// A slot store backed by a map.
#[derive(Debug, Default)]
pub struct InMemorySlotStore {
    slots: Mutex<BTreeMap<String, GameSave>>,
}

impl InMemorySlotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of a stored slot.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, slot_id: &str) -> Option<GameSave> {
        self.slots.lock().unwrap().get(slot_id).cloned()
    }
}

#[async_trait]
impl SaveSlotStore for InMemorySlotStore {
    async fn save(&self, slot_id: &str, save: &GameSave) -> Result<(), EngineError> {
        self.slots
            .lock()
            .unwrap()
            .insert(slot_id.to_owned(), save.clone());
        Ok(())
    }

    async fn load(&self, slot_id: &str) -> Result<GameSave, EngineError> {
        self.get(slot_id)
            .ok_or_else(|| EngineError::SlotNotFound(slot_id.to_owned()))
    }

    async fn slot_exists(&self, slot_id: &str) -> Result<bool, EngineError> {
        Ok(self.slots.lock().unwrap().contains_key(slot_id))
    }

    async fn list_slots(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.slots.lock().unwrap().keys().cloned().collect())
    }

    async fn delete(&self, slot_id: &str) -> Result<(), EngineError> {
        self.slots.lock().unwrap().remove(slot_id);
        Ok(())
    }
}

/// A slot store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingSlotStore;

fn unavailable() -> EngineError {
    EngineError::Infrastructure("storage unavailable".into())
}

#[async_trait]
impl SaveSlotStore for FailingSlotStore {
    async fn save(&self, _slot_id: &str, _save: &GameSave) -> Result<(), EngineError> {
        Err(unavailable())
    }

    async fn load(&self, _slot_id: &str) -> Result<GameSave, EngineError> {
        Err(unavailable())
    }

    async fn slot_exists(&self, _slot_id: &str) -> Result<bool, EngineError> {
        Err(unavailable())
    }

    async fn list_slots(&self) -> Result<Vec<String>, EngineError> {
        Err(unavailable())
    }

    async fn delete(&self, _slot_id: &str) -> Result<(), EngineError> {
        Err(unavailable())
    }
}
