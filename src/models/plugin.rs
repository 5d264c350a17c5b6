use std::hash::{Hash, Hasher};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::models::settings::GameSettings;
use crate::services::probe::PluginProbe;

/// Case-insensitive filename comparison.
///
/// Uses Unicode lowercasing rather than plain ASCII folding so that names
/// carried over from the OS-local code page (e.g. `Blàñk.esm`) compare the
/// way the games compare them.
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

/// Lowercase-folded form used as the identity key for a plugin name.
pub(crate) fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// A plugin filename with case-insensitive identity.
///
/// Stores the original-case string as first seen, but compares, hashes and
/// deduplicates by the lowercase-folded key, so `Blank.esm` and `BLANK.ESM`
/// are the same plugin while round-tripping with their original spelling.
#[derive(Debug, Clone)]
pub struct PluginName {
    name: String,
    key: String,
}

impl PluginName {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let key = fold_name(&name);
        Self { name, key }
    }

    /// The name exactly as it was first given.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// The lowercase-folded identity key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn matches(&self, other: &str) -> bool {
        self.key == fold_name(other)
    }
}

impl PartialEq for PluginName {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PluginName {}

impl Hash for PluginName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for PluginName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// One entry of the load order: a plugin file, its master classification and
/// its activation flag.
#[derive(Debug, Clone)]
pub struct Plugin {
    name: PluginName,
    is_master: bool,
    active: bool,
    modified: SystemTime,
}

impl Plugin {
    /// Build an entry for `name`, classifying it through the probe and
    /// reading its modification time.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPlugin`] if the probe rejects the name, [`Error::Io`]
    /// if its metadata cannot be read.
    pub fn new(name: &str, settings: &GameSettings, probe: &mut PluginProbe) -> Result<Self> {
        let Some(classified) = probe.classify(name, settings) else {
            return Err(Error::InvalidPlugin(name.to_string()));
        };
        let is_master = probe.is_master(name, settings);

        let modified = std::fs::metadata(&classified.path)
            .and_then(|m| m.modified())
            .map_err(|e| Error::io(classified.path.clone(), e))?;

        Ok(Self {
            name: PluginName::new(name),
            is_master,
            active: false,
            modified,
        })
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub(crate) fn key(&self) -> &str {
        self.name.key()
    }

    pub fn is_master(&self) -> bool {
        self.is_master
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Last-write time of the plugin file as read when the entry was built.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn name_matches(&self, other: &str) -> bool {
        self.name.matches(other)
    }

    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    /// In-memory fixture for rule tests that do not need real files.
    #[cfg(test)]
    pub(crate) fn fixture(name: &str, is_master: bool) -> Self {
        Self {
            name: PluginName::new(name),
            is_master,
            active: false,
            modified: SystemTime::UNIX_EPOCH,
        }
    }
}
