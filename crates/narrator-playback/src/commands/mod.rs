//! Built-in command kinds.

mod audio;
mod choice;
mod flow;
mod text;
mod variables;

pub use audio::PlayVoiceCommand;
pub use choice::AddChoiceCommand;
pub use flow::{GotoCommand, ProcessInputCommand, ResetStateCommand, StopCommand, WaitCommand};
pub use text::{ClearBacklogCommand, PrintCommand};
pub use variables::SetCommand;
