//! Save slot repository abstraction.

use async_trait::async_trait;

use crate::error::EngineError;
use crate::snapshot::GameSave;

/// Durable storage mapping named slots to saved games.
#[async_trait]
pub trait SaveSlotStore: Send + Sync {
    /// Writes `save` to `slot_id`, replacing any previous contents.
    async fn save(&self, slot_id: &str, save: &GameSave) -> Result<(), EngineError>;

    /// Reads a slot. Fails with `EngineError::SlotNotFound` when absent.
    async fn load(&self, slot_id: &str) -> Result<GameSave, EngineError>;

    /// Whether the slot exists.
    async fn slot_exists(&self, slot_id: &str) -> Result<bool, EngineError>;

    /// Lists every stored slot id.
    async fn list_slots(&self) -> Result<Vec<String>, EngineError>;

    /// Removes a slot. Removing a missing slot is not an error.
    async fn delete(&self, slot_id: &str) -> Result<(), EngineError>;
}

/// Expands a slot mask such as `GameSave{0}` with a slot number.
#[must_use]
pub fn format_slot_id(mask: &str, number: usize) -> String {
    mask.replace("{0}", &number.to_string())
}

/// Turns a slot mask into a wildcard pattern (`GameSave{0}` -> `GameSave*`).
#[must_use]
pub fn slot_pattern(mask: &str) -> String {
    mask.replace("{0}", "*")
}

/// Matches a slot id against a pattern where `*` stands for any run of
/// characters.
#[must_use]
pub fn slot_matches_pattern(pattern: &str, slot_id: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == slot_id;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if slot_id.len() < first.len() + last.len()
        || !slot_id.starts_with(first)
        || !slot_id.ends_with(last)
    {
        return false;
    }

    let mut rest = &slot_id[first.len()..slot_id.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(position) => rest = &rest[position + part.len()..],
            None => return false,
        }
    }
    true
}
