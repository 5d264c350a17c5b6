//! Stateless ordering rules.
//!
//! Pure predicates over a candidate plugin sequence, shared by the state
//! engine's mutators and the load-time fixup. Nothing here touches the
//! filesystem or mutates anything.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::models::plugin::{fold_name, Plugin};
use crate::models::settings::{GameSettings, LoadOrderMethod};

/// Index of the first non-master entry, if any.
pub fn first_non_master_position(plugins: &[Plugin]) -> Option<usize> {
    plugins.iter().position(|p| !p.is_master())
}

/// Whether every master precedes every non-master.
pub fn is_partitioned(plugins: &[Plugin]) -> bool {
    match first_non_master_position(plugins) {
        None => true,
        Some(i) => plugins[i..].iter().all(|p| !p.is_master()),
    }
}

/// Rejects sequences that name the same plugin twice, case-insensitively.
pub fn check_no_duplicates(names: &[&str]) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(fold_name(name)) {
            return Err(Error::DuplicatePlugin((*name).to_string()));
        }
    }
    Ok(())
}

/// For textfile-based games the sequence must open with the game's master
/// file; timestamp-based games are unconstrained.
pub fn check_anchor(names: &[&str], settings: &GameSettings) -> Result<()> {
    if settings.method() != LoadOrderMethod::Textfile {
        return Ok(());
    }
    match names.first() {
        Some(first) if settings.is_master_file(first) => Ok(()),
        _ => Err(Error::MasterMustLoadFirst),
    }
}

/// Canonical position for inserting `plugin` into `plugins`.
///
/// The game's master file anchors to index 0 on textfile-based games; other
/// masters go immediately after the last master; non-masters go at the end.
pub fn insertion_position(
    plugin: &Plugin,
    plugins: &[Plugin],
    settings: &GameSettings,
) -> usize {
    if settings.method() == LoadOrderMethod::Textfile && settings.is_master_file(plugin.name()) {
        return 0;
    }
    if plugin.is_master() {
        first_non_master_position(plugins).unwrap_or(plugins.len())
    } else {
        plugins.len()
    }
}
