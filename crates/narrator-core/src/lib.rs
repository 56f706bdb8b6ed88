//! Narrator Core — shared playback abstractions.
//!
//! This crate defines the value types and collaborator traits that the
//! script, playback, and state crates depend on. It contains no
//! infrastructure code.

pub mod cancel;
pub mod clock;
pub mod error;
pub mod observer;
pub mod presentation;
pub mod repository;
pub mod snapshot;
pub mod spot;
pub mod subsystem;
pub mod value;
