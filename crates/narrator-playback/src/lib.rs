//! Narrator Playback — commands, playlists and the script player.
//!
//! A [`playlist::Playlist`] flattens a parsed script into commands tagged
//! with playback spots. The [`player::ScriptPlayer`] walks a playlist on a
//! single logical timeline, honouring forced waits, input waits, playback
//! modes and per-play cancellation.

pub mod command;
pub mod commands;
pub mod config;
pub mod context;
pub mod events;
pub mod library;
pub mod pacing;
pub mod player;
pub mod playlist;
pub mod presenter;
pub mod registry;
pub mod services;
