//! Stateful subsystem abstraction.

use async_trait::async_trait;

use crate::error::EngineError;

/// A service whose state is captured in snapshots and restored on rollback
/// or load. The state manager treats the serialized state as an opaque blob.
#[async_trait]
pub trait StatefulSubsystem: Send + Sync {
    /// Stable identifier used as the key in snapshots and reset exclusions.
    fn subsystem_id(&self) -> &str;

    /// Serializes the current state.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Serialization` if the state cannot be encoded.
    fn save_state(&self) -> Result<String, EngineError>;

    /// Replaces the current state with a previously saved one.
    async fn load_state(&self, state: &str) -> Result<(), EngineError>;

    /// Restores the fresh/default state.
    async fn reset_state(&self);
}
