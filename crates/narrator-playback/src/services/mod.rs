//! Built-in stateful services.
//!
//! Each service owns one slice of engine state and takes part in snapshots
//! through [`narrator_core::subsystem::StatefulSubsystem`].

pub mod backlog;
pub mod choices;
pub mod input;
pub mod variables;

pub use backlog::{Backlog, BacklogMessage};
pub use choices::ChoiceState;
pub use input::InputGate;
pub use variables::VariableStore;
