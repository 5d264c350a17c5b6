//! Plugin classification: is a filename a valid plugin, and is it a master?
//!
//! Validity is decided by a [`PluginValidator`], a pure function of file
//! contents. The crate ships [`HeaderValidator`], which sniffs the plugin
//! header the way the game engines do; plugin managers that already parse
//! plugins can supply their own implementation instead.
//!
//! [`PluginProbe`] wraps the validator with the existence check and a
//! per-instance cache, so a `load` pass probes each filename at most once.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::models::plugin::fold_name;
use crate::models::settings::{GameSettings, MASTER_EXTENSION};

/// Header facts extracted from a plugin file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginHeader {
    /// Whether the header's master flag is set.
    pub is_master: bool,
}

/// Decides whether a file is a plugin, from its contents alone.
pub trait PluginValidator: Send + Sync {
    /// `Some` with the header facts if the file is a plugin, `None` if it is
    /// not (unreadable files are not plugins).
    fn validate(&self, path: &Utf8Path) -> Option<PluginHeader>;
}

/// Default validator: checks the leading header record of the file.
///
/// Morrowind-lineage plugins open with a `TES3` record and carry no master
/// flag in the header (the `.esm` extension decides); everything later opens
/// with a `TES4` record whose flags field (little-endian u32 at byte offset
/// 8) has bit `0x1` set for masters.
#[derive(Debug, Default, Clone)]
pub struct HeaderValidator;

impl PluginValidator for HeaderValidator {
    fn validate(&self, path: &Utf8Path) -> Option<PluginHeader> {
        let mut file = std::fs::File::open(path).ok()?;
        let mut header = [0u8; 12];
        file.read_exact(&mut header).ok()?;

        match &header[0..4] {
            b"TES4" => {
                let flags = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
                Some(PluginHeader {
                    is_master: flags & 0x1 != 0,
                })
            }
            b"TES3" => Some(PluginHeader { is_master: false }),
            _ => None,
        }
    }
}

/// A cached probe answer for one filename.
#[derive(Debug, Clone)]
pub(crate) struct Classified {
    pub header: PluginHeader,
    /// The path the name resolved to, which may differ from the name in case
    /// on case-sensitive filesystems.
    pub path: Utf8PathBuf,
}

/// Caching front of the validator.
///
/// Answers are cached per folded filename; [`PluginProbe::invalidate`] drops
/// the cache and is called at the start of every `load`. Name-to-file
/// resolution is case-insensitive even on case-sensitive filesystems, to
/// match how the games themselves treat plugin names.
pub struct PluginProbe {
    validator: Arc<dyn PluginValidator>,
    cache: HashMap<String, Option<Classified>>,
}

impl PluginProbe {
    pub fn new(validator: Arc<dyn PluginValidator>) -> Self {
        Self {
            validator,
            cache: HashMap::new(),
        }
    }

    /// Drop every cached answer.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// Whether `name` exists in the plugins folder and passes the validator.
    pub fn is_valid(&mut self, name: &str, settings: &GameSettings) -> bool {
        self.classify(name, settings).is_some()
    }

    /// Whether `name` is a master: valid, and either header-flagged as a
    /// master or carrying the conventional master extension.
    pub fn is_master(&mut self, name: &str, settings: &GameSettings) -> bool {
        match self.classify(name, settings) {
            Some(classified) => {
                classified.header.is_master || fold_name(name).ends_with(MASTER_EXTENSION)
            }
            None => false,
        }
    }

    pub(crate) fn classify(&mut self, name: &str, settings: &GameSettings) -> Option<Classified> {
        let key = fold_name(name);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let classified = resolve_path(name, settings).and_then(|path| {
            self.validator
                .validate(&path)
                .map(|header| Classified { header, path })
        });

        self.cache.insert(key, classified.clone());
        classified
    }
}

/// Find the file `name` refers to inside the plugins folder, falling back to
/// a case-insensitive scan when the exact spelling is not on disk.
pub(crate) fn resolve_path(name: &str, settings: &GameSettings) -> Option<Utf8PathBuf> {
    let direct = settings.plugin_path(name);
    if direct.is_file() {
        return Some(direct);
    }

    let key = fold_name(name);
    let entries = std::fs::read_dir(settings.plugins_folder()).ok()?;
    for entry in entries.flatten() {
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };
        if fold_name(&file_name) == key && entry.file_type().is_ok_and(|t| t.is_file()) {
            return Some(settings.plugin_path(&file_name));
        }
    }
    None
}

impl std::fmt::Debug for PluginProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginProbe")
            .field("cached", &self.cache.len())
            .finish()
    }
}
