//! Narrator Slot Store — save slots on the local filesystem.
//!
//! Each slot is one file under a root directory, named after the slot id.
//! Saves are written as readable JSON (`.json`) or as a compact binary
//! encoding (`.nson`); see [`format::SaveFormat`].

pub mod format;
pub mod store;

pub use format::SaveFormat;
pub use store::FileSlotStore;
