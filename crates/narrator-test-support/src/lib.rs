//! Shared test doubles for the Narrator engine.

mod clock;
mod presenter;
mod slots;
mod subsystem;

pub use clock::FixedClock;
pub use presenter::{RecordingPresenter, RecordingResourceLoader};
pub use slots::{FailingSlotStore, InMemorySlotStore};
pub use subsystem::CounterSubsystem;
