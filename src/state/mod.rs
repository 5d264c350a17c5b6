//! The load order state engine.
//!
//! [`LoadOrder`] holds the ordered plugin sequence with its activation
//! overlay and enforces the ordering invariants on every mutation:
//!
//! - no case-insensitive duplicate names
//! - masters before non-masters
//! - the game's master file anchored at index 0 and active (textfile games)
//! - `Update.esm` present and active when installed (TES5)
//! - every entry valid on disk
//! - at most [`MAX_ACTIVE`] active plugins
//!
//! Mutators are all-or-nothing: a candidate state is built and validated
//! before it replaces the current one, so a failed call leaves the state
//! exactly as it was. Persistence (`load`/`save`) branches on the settings'
//! [`LoadOrderMethod`] and delegates the file work to
//! [`services::persistence`](crate::services::persistence).

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::plugin::{fold_name, names_match, Plugin};
use crate::models::settings::{GameId, GameSettings, LoadOrderMethod, UPDATE_MASTER};
use crate::rules;
use crate::services::persistence;
use crate::services::probe::{HeaderValidator, PluginProbe, PluginValidator};

/// Hard cap on simultaneously active plugins, imposed by the game engines.
pub const MAX_ACTIVE: usize = 255;

/// An in-memory load order: ordered plugin entries plus their active flags.
///
/// Create one per game installation, `load` it, mutate it, `save` it. Each
/// instance is single-owner; callers needing shared access must serialise
/// externally.
pub struct LoadOrder {
    plugins: Vec<Plugin>,
    probe: PluginProbe,
}

impl LoadOrder {
    /// An empty load order using the built-in header validator.
    pub fn new() -> Self {
        Self::with_validator(Arc::new(HeaderValidator))
    }

    /// An empty load order using a caller-supplied plugin validator.
    pub fn with_validator(validator: Arc<dyn PluginValidator>) -> Self {
        Self {
            plugins: Vec::new(),
            probe: PluginProbe::new(validator),
        }
    }

    // --- read surface ---

    /// The entries in load order.
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// Plugin names in load order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    /// Names of the active plugins, in load-order order.
    pub fn active_plugin_names(&self) -> Vec<String> {
        self.plugins
            .iter()
            .filter(|p| p.is_active())
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Position of `name`, or the current length when `name` is not present
    /// (the "beyond end" sentinel).
    pub fn position(&self, name: &str) -> usize {
        self.index_of(name).unwrap_or(self.plugins.len())
    }

    /// Name of the plugin at `position`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] when `position` is past the last entry.
    pub fn plugin_at(&self, position: usize) -> Result<&str> {
        self.plugins
            .get(position)
            .map(Plugin::name)
            .ok_or(Error::OutOfRange(position))
    }

    /// Whether `name` is active, case-insensitively. Absent names are
    /// inactive.
    pub fn is_active(&self, name: &str) -> bool {
        self.index_of(name)
            .is_some_and(|i| self.plugins[i].is_active())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name_matches(name))
    }

    fn count_active(&self) -> usize {
        self.plugins.iter().filter(|p| p.is_active()).count()
    }

    // --- mutators ---

    /// Replace the whole sequence with `names`.
    ///
    /// The new sequence must be free of duplicates, fully valid, partitioned
    /// masters-first and (on textfile games) anchored by the game's master
    /// file, or the call fails with no change. Active flags carry over for
    /// names that survive the replacement; on textfile games the master file
    /// comes out active, and on TES5 an installed `Update.esm` is kept in the
    /// order and active even when `names` omits it.
    pub fn set_load_order(&mut self, names: &[&str], settings: &GameSettings) -> Result<()> {
        rules::check_no_duplicates(names)?;
        rules::check_anchor(names, settings)?;

        let mut next = Vec::with_capacity(names.len());
        for name in names {
            let plugin = match self.index_of(name) {
                Some(i) => self.plugins[i].clone(),
                None => Plugin::new(name, settings, &mut self.probe)?,
            };
            next.push(plugin);
        }

        if !rules::is_partitioned(&next) {
            return Err(Error::NonMasterBeforeMaster);
        }

        if settings.method() == LoadOrderMethod::Textfile {
            if let Some(master) = next
                .iter_mut()
                .find(|p| settings.is_master_file(p.name()))
            {
                master.activate();
            }
        }
        if settings.game_id() == GameId::Tes5 {
            self.ensure_active(&mut next, UPDATE_MASTER, settings)?;
        }

        self.plugins = next;
        Ok(())
    }

    /// Move `name` to `position`, inserting it first if it is not in the
    /// order. The final position is clamped to the end of the order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPlugin`] for names the probe rejects;
    /// [`Error::MasterMustLoadFirst`] when a textfile game's anchor would be
    /// disturbed in either direction; [`Error::NonMasterBeforeMaster`] when
    /// the move would break the master partition.
    pub fn set_position(
        &mut self,
        name: &str,
        position: usize,
        settings: &GameSettings,
    ) -> Result<()> {
        if settings.method() == LoadOrderMethod::Textfile
            && settings.is_master_file(name) != (position == 0)
        {
            return Err(Error::MasterMustLoadFirst);
        }

        let mut next = self.plugins.clone();
        let plugin = match next.iter().position(|p| p.name_matches(name)) {
            Some(i) => next.remove(i),
            None => Plugin::new(name, settings, &mut self.probe)?,
        };
        next.insert(position.min(next.len()), plugin);

        if !rules::is_partitioned(&next) {
            return Err(Error::NonMasterBeforeMaster);
        }

        self.plugins = next;
        Ok(())
    }

    /// Set `name` active, inserting it at its canonical position if absent.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidPlugin`] if the probe rejects `name`;
    /// [`Error::TooManyActivePlugins`] if the cap is already reached and
    /// `name` was not active.
    pub fn activate(&mut self, name: &str, settings: &GameSettings) -> Result<()> {
        match self.index_of(name) {
            Some(i) => {
                if !self.plugins[i].is_active() && self.count_active() == MAX_ACTIVE {
                    return Err(Error::TooManyActivePlugins);
                }
                self.plugins[i].activate();
            }
            None => {
                let mut plugin = Plugin::new(name, settings, &mut self.probe)?;
                if self.count_active() == MAX_ACTIVE {
                    return Err(Error::TooManyActivePlugins);
                }
                plugin.activate();
                let position = rules::insertion_position(&plugin, &self.plugins, settings);
                self.plugins.insert(position, plugin);
            }
        }
        Ok(())
    }

    /// Clear the active flag of `name`. A no-op when `name` is absent.
    ///
    /// # Errors
    ///
    /// [`Error::ForbiddenDeactivation`] for a textfile game's master file and
    /// for TES5's update master.
    pub fn deactivate(&mut self, name: &str, settings: &GameSettings) -> Result<()> {
        if settings.method() == LoadOrderMethod::Textfile && settings.is_master_file(name) {
            return Err(Error::ForbiddenDeactivation(name.to_string()));
        }
        if settings.game_id() == GameId::Tes5 && names_match(name, UPDATE_MASTER) {
            return Err(Error::ForbiddenDeactivation(name.to_string()));
        }

        if let Some(i) = self.index_of(name) {
            self.plugins[i].deactivate();
        }
        Ok(())
    }

    /// Replace the active set with `names` (a case-insensitive set; duplicate
    /// spellings collapse). Names absent from the order are inserted at their
    /// canonical positions; previously active names not given become
    /// inactive but stay in the order.
    ///
    /// # Errors
    ///
    /// [`Error::TooManyActivePlugins`] when more than [`MAX_ACTIVE`] distinct
    /// names are given; [`Error::InvalidPlugin`] when any name fails the
    /// probe; [`Error::ForbiddenDeactivation`] when the set omits a textfile
    /// game's master file, or TES5's update master while it is installed.
    pub fn set_active_plugins(&mut self, names: &[&str], settings: &GameSettings) -> Result<()> {
        let mut unique: Vec<&str> = Vec::with_capacity(names.len());
        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            if seen.insert(fold_name(name)) {
                unique.push(name);
            }
        }

        if unique.len() > MAX_ACTIVE {
            return Err(Error::TooManyActivePlugins);
        }
        if settings.method() == LoadOrderMethod::Textfile
            && !seen.contains(&fold_name(settings.master_file()))
        {
            return Err(Error::ForbiddenDeactivation(
                settings.master_file().to_string(),
            ));
        }
        if settings.game_id() == GameId::Tes5
            && self.probe.is_valid(UPDATE_MASTER, settings)
            && !seen.contains(&fold_name(UPDATE_MASTER))
        {
            return Err(Error::ForbiddenDeactivation(UPDATE_MASTER.to_string()));
        }

        // Resolve every name before touching state, so an invalid entry
        // cannot leave a half-applied set behind.
        let mut existing = Vec::new();
        let mut added = Vec::new();
        for name in unique {
            match self.index_of(name) {
                Some(i) => existing.push(i),
                None => added.push(Plugin::new(name, settings, &mut self.probe)?),
            }
        }

        for plugin in &mut self.plugins {
            plugin.deactivate();
        }
        for i in existing {
            self.plugins[i].activate();
        }
        for mut plugin in added {
            plugin.activate();
            let position = rules::insertion_position(&plugin, &self.plugins, settings);
            self.plugins.insert(position, plugin);
        }
        Ok(())
    }

    /// Discard every entry.
    pub fn clear(&mut self) {
        self.plugins.clear();
    }

    // --- persistence ---

    /// Rebuild the state from disk, discarding the current contents.
    ///
    /// The order source depends on the game's method (folder timestamps, or
    /// the load-order file with the active-plugins file as fallback); the
    /// active set always comes from the active-plugins file. Malformed lines
    /// in the active-plugins file are dropped, an over-long active list is
    /// truncated at [`MAX_ACTIVE`], and the mandatory activations are
    /// applied. Only whole-file I/O failures surface as errors, leaving the
    /// previous state in place.
    pub fn load(&mut self, settings: &GameSettings) -> Result<()> {
        self.probe.invalidate();

        let mut next = match settings.method() {
            LoadOrderMethod::Timestamp => self.read_timestamp_order(settings)?,
            LoadOrderMethod::Textfile => self.read_textfile_order(settings)?,
        };
        self.apply_persisted_activations(&mut next, settings)?;

        tracing::debug!(
            plugins = next.len(),
            active = next.iter().filter(|p| p.is_active()).count(),
            "loaded load order"
        );
        self.plugins = next;
        Ok(())
    }

    /// Persist the state: write the plugin timestamps (timestamp games) or
    /// the load-order file (textfile games), then the active-plugins file.
    ///
    /// Writes are individually atomic but not rolled back as a pair: if the
    /// second write fails the first stays on disk, and the in-memory state is
    /// untouched either way.
    pub fn save(&self, settings: &GameSettings) -> Result<()> {
        match settings.method() {
            LoadOrderMethod::Timestamp => {
                persistence::stamp_plugin_files(&self.plugins, settings)?;
            }
            LoadOrderMethod::Textfile => {
                if let Some(path) = settings.load_order_file() {
                    let names: Vec<&str> = self.plugins.iter().map(Plugin::name).collect();
                    persistence::write_load_order_file(path, &names)?;
                }
            }
        }

        let active: Vec<&str> = self
            .plugins
            .iter()
            .filter(|p| p.is_active())
            .map(Plugin::name)
            .collect();
        persistence::write_active_plugins_file(settings, &active)
    }

    // --- load helpers ---

    fn read_timestamp_order(&mut self, settings: &GameSettings) -> Result<Vec<Plugin>> {
        let mut plugins = Vec::new();
        for name in persistence::scan_plugins_folder(settings)? {
            if self.probe.is_valid(&name, settings) {
                plugins.push(Plugin::new(&name, settings, &mut self.probe)?);
            }
        }
        sort_by_timestamp(&mut plugins);
        Ok(plugins)
    }

    fn read_textfile_order(&mut self, settings: &GameSettings) -> Result<Vec<Plugin>> {
        let names = match settings.load_order_file() {
            Some(path) if path.exists() => persistence::read_load_order_file(path)?,
            _ => persistence::parse_active_plugins_file(settings)?,
        };

        let mut seen = HashSet::new();
        let mut plugins = Vec::new();
        for name in &names {
            if !self.probe.is_valid(name, settings) {
                tracing::debug!(name = %name, "dropping invalid load order entry");
                continue;
            }
            if !seen.insert(fold_name(name)) {
                continue;
            }
            plugins.push(Plugin::new(name, settings, &mut self.probe)?);
        }

        // Masters ahead of non-masters, relative order preserved.
        plugins.sort_by_key(|p| !p.is_master());

        match plugins
            .iter()
            .position(|p| settings.is_master_file(p.name()))
        {
            Some(0) => {}
            Some(i) => {
                let master = plugins.remove(i);
                plugins.insert(0, master);
            }
            None if self.probe.is_valid(settings.master_file(), settings) => {
                let master = Plugin::new(settings.master_file(), settings, &mut self.probe)?;
                plugins.insert(0, master);
            }
            None => {}
        }

        // Plugins on disk but missing from the file join at their canonical
        // positions, in timestamp order among themselves.
        let mut missing = Vec::new();
        for name in persistence::scan_plugins_folder(settings)? {
            if plugins.iter().any(|p| p.name_matches(&name)) {
                continue;
            }
            if self.probe.is_valid(&name, settings) {
                missing.push(Plugin::new(&name, settings, &mut self.probe)?);
            }
        }
        sort_by_timestamp(&mut missing);
        for plugin in missing {
            let position = rules::insertion_position(&plugin, &plugins, settings);
            plugins.insert(position, plugin);
        }

        Ok(plugins)
    }

    fn apply_persisted_activations(
        &mut self,
        plugins: &mut Vec<Plugin>,
        settings: &GameSettings,
    ) -> Result<()> {
        let persisted = persistence::parse_active_plugins_file(settings)?;

        let mut accepted = 0;
        for name in &persisted {
            if accepted == MAX_ACTIVE {
                tracing::warn!(
                    limit = MAX_ACTIVE,
                    "active-plugins file lists too many plugins; truncating"
                );
                break;
            }
            let index = match plugins.iter().position(|p| p.name_matches(name)) {
                Some(i) => Some(i),
                None if self.probe.is_valid(name, settings) => {
                    let plugin = Plugin::new(name, settings, &mut self.probe)?;
                    let position = rules::insertion_position(&plugin, plugins, settings);
                    plugins.insert(position, plugin);
                    Some(position)
                }
                None => {
                    tracing::debug!(name = %name, "dropping invalid active-plugins entry");
                    None
                }
            };
            if let Some(i) = index {
                if !plugins[i].is_active() {
                    plugins[i].activate();
                    accepted += 1;
                }
            }
        }

        if settings.method() == LoadOrderMethod::Textfile {
            self.ensure_active(plugins, settings.master_file(), settings)?;
        }
        if settings.game_id() == GameId::Tes5 {
            self.ensure_active(plugins, UPDATE_MASTER, settings)?;
        }

        deactivate_excess(plugins, settings);
        Ok(())
    }

    /// Activate `name`, inserting it at its canonical position if it is
    /// valid but absent. Invalid or missing names are skipped, not errors: a
    /// broken install must not poison the enclosing operation. Backs the
    /// mandatory activations (textfile master, TES5 update master).
    fn ensure_active(
        &mut self,
        plugins: &mut Vec<Plugin>,
        name: &str,
        settings: &GameSettings,
    ) -> Result<()> {
        if let Some(i) = plugins.iter().position(|p| p.name_matches(name)) {
            plugins[i].activate();
        } else if self.probe.is_valid(name, settings) {
            let mut plugin = Plugin::new(name, settings, &mut self.probe)?;
            plugin.activate();
            let position = rules::insertion_position(&plugin, plugins, settings);
            plugins.insert(position, plugin);
        }
        Ok(())
    }
}

impl Default for LoadOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoadOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOrder")
            .field("plugins", &self.plugins)
            .finish()
    }
}

/// Timestamp ordering: masters first, then ascending mtime, names as the
/// tiebreaker.
fn sort_by_timestamp(plugins: &mut [Plugin]) {
    plugins.sort_by(|a, b| {
        b.is_master()
            .cmp(&a.is_master())
            .then(a.modified().cmp(&b.modified()))
            .then_with(|| a.key().cmp(b.key()))
    });
}

/// Drop active flags from the end of the order until the cap holds again,
/// never touching the implicitly active plugins.
fn deactivate_excess(plugins: &mut [Plugin], settings: &GameSettings) {
    let mut active = plugins.iter().filter(|p| p.is_active()).count();
    for plugin in plugins.iter_mut().rev() {
        if active <= MAX_ACTIVE {
            break;
        }
        if plugin.is_active() && !settings.is_implicitly_active(plugin.name()) {
            plugin.deactivate();
            active -= 1;
        }
    }
}
