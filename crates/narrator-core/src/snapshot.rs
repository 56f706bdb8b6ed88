//! Serializable engine state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::spot::PlaybackSpot;

/// State of every registered subsystem, captured right before the command at
/// `spot` was dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Playback position at capture time.
    pub spot: PlaybackSpot,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
    /// Opaque serialized state keyed by subsystem id.
    pub subsystems: BTreeMap<String, String>,
}

impl StateSnapshot {
    /// Returns the serialized state of one subsystem.
    #[must_use]
    pub fn state_of(&self, subsystem_id: &str) -> Option<&str> {
        self.subsystems.get(subsystem_id).map(String::as_str)
    }
}

/// Contents of a save slot: the most recent snapshots, oldest first. The
/// last one is where playback resumes after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSave {
    /// When the save was written.
    pub saved_at: DateTime<Utc>,
    /// Saved snapshots, oldest first.
    pub snapshots: Vec<StateSnapshot>,
}

impl GameSave {
    /// The snapshot playback resumes from.
    #[must_use]
    pub fn resume_snapshot(&self) -> Option<&StateSnapshot> {
        self.snapshots.last()
    }
}
