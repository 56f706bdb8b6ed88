//! Narrator State — snapshots, rollback, saves and hot reload.
//!
//! The [`manager::StateManager`] captures every registered subsystem right
//! before each command is dispatched, keeps a bounded history of those
//! snapshots, and uses it to roll playback back, persist save slots, and
//! resynchronize after a script edit ([`hot_reload`]).

pub mod config;
pub mod history;
pub mod hot_reload;
pub mod manager;

#[cfg(test)]
mod testing;
