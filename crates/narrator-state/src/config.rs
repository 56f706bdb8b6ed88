//! State manager configuration.

use narrator_core::error::EngineError;
use serde::{Deserialize, Serialize};

/// Tunables for snapshots and save slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Snapshots kept for rollback; the oldest is evicted beyond this.
    pub rollback_capacity: usize,
    /// Newest snapshots written into a save slot.
    pub saved_rollback_steps: usize,
    /// Slot id mask for regular saves; `{0}` is the slot number.
    pub save_slot_mask: String,
    /// Slot id mask for quick saves.
    pub quick_save_slot_mask: String,
    /// Quick save slots kept in rotation.
    pub quick_save_slot_limit: usize,
    /// Subsystems left alone by a reset unless told otherwise.
    pub reset_excluded: Vec<String>,
    /// Write save slots in the compact binary format.
    pub binary_save_files: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            rollback_capacity: 128,
            saved_rollback_steps: 1,
            save_slot_mask: "GameSave{0}".to_owned(),
            quick_save_slot_mask: "GameQuickSave{0}".to_owned(),
            quick_save_slot_limit: 3,
            reset_excluded: vec!["variables".to_owned()],
            binary_save_files: false,
        }
    }
}

impl StateConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for a zero capacity or limit, or
    /// a slot mask without the `{0}` placeholder.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.rollback_capacity == 0 {
            return Err(EngineError::Validation(
                "rollback_capacity must be at least 1".to_owned(),
            ));
        }
        if self.saved_rollback_steps == 0 || self.saved_rollback_steps > self.rollback_capacity {
            return Err(EngineError::Validation(
                "saved_rollback_steps must be between 1 and rollback_capacity".to_owned(),
            ));
        }
        if self.quick_save_slot_limit == 0 {
            return Err(EngineError::Validation(
                "quick_save_slot_limit must be at least 1".to_owned(),
            ));
        }
        for mask in [&self.save_slot_mask, &self.quick_save_slot_mask] {
            if !mask.contains("{0}") {
                return Err(EngineError::Validation(format!(
                    "slot mask `{mask}` lacks the {{0}} placeholder"
                )));
            }
        }
        Ok(())
    }
}
