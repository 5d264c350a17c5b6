//! Data models for the load order engine.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`GameSettings`]: read-only description of one game installation —
//!   identity, persistence method, master filename and persisted-file paths
//! - [`Plugin`]: one load order entry with its master flag and activation state
//! - [`PluginName`]: case-insensitive filename identity
//!
//! # Architecture Note
//!
//! `GameSettings` derives `Serialize`/`Deserialize` so consumers can persist
//! it alongside their own configuration. The engine itself only ever reads it;
//! all state mutation goes through [`LoadOrder`](crate::state::LoadOrder).

pub mod plugin;
pub mod settings;

pub use plugin::{names_match, Plugin, PluginName};
pub use settings::{GameId, GameSettings, LoadOrderMethod, MASTER_EXTENSION, UPDATE_MASTER};
