//! Services module - the I/O-facing logic around the state engine.
//!
//! Everything here is **framework-agnostic** and free of hidden state, so a
//! plugin manager can reuse the pieces directly:
//!
//! - [`probe`]: plugin classification. The [`PluginValidator`] trait decides
//!   "is this file a plugin?" from contents alone; [`HeaderValidator`] is the
//!   built-in header-sniffing implementation and [`PluginProbe`] adds the
//!   existence check plus per-instance caching.
//!
//! - [`persistence`]: parsing and writing of the persisted files — the
//!   UTF-8 load-order file, the Windows-1252 active-plugins file with its
//!   TES3 `GameFile<N>=` prefixes, folder scanning, and the timestamp
//!   stamping used by timestamp-based games. Writes are atomic
//!   (temp-file-plus-rename).
//!
//! - [`sync`]: the cross-file equivalence check telling a manager whether the
//!   load-order and active-plugins files of a textfile-based game still
//!   agree.

pub mod persistence;
pub mod probe;
pub mod sync;

pub use probe::{HeaderValidator, PluginHeader, PluginProbe, PluginValidator};
pub use sync::is_synchronised;
