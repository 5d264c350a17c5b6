// loadorder - load order and active-plugin management for Bethesda-style games
//
// This is the library crate containing the state engine and the persistence
// logic. Consumers construct a [`GameSettings`] describing one game
// installation, then drive a [`LoadOrder`] with it.

pub mod encoding;
pub mod error;
pub mod models;
pub mod rules;
pub mod services;
pub mod state;

// Re-export the public surface for convenience
pub use error::{Error, Result};
pub use models::{GameId, GameSettings, LoadOrderMethod, Plugin, PluginName, UPDATE_MASTER};
pub use services::{is_synchronised, HeaderValidator, PluginHeader, PluginValidator};
pub use state::{LoadOrder, MAX_ACTIVE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
