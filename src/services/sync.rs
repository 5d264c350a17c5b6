//! Cross-file consistency check for textfile-based games.
//!
//! The load-order file and the active-plugins file both encode ordering for
//! textfile-based games, and external tools routinely update one without the
//! other. This check tells a plugin manager whether the two files still agree
//! before it trusts them.

use std::collections::HashSet;

use crate::error::Result;
use crate::models::plugin::{fold_name, names_match};
use crate::models::settings::{GameSettings, LoadOrderMethod};
use crate::services::persistence;

/// Whether the persisted load-order and active-plugins files agree.
///
/// True when either file is absent, or when filtering the load-order file
/// down to the names present in the active-plugins file yields the active
/// file's own sequence, compared case-insensitively line by line. Trivially
/// true for timestamp-based games, which have only one source of truth.
pub fn is_synchronised(settings: &GameSettings) -> Result<bool> {
    if settings.method() != LoadOrderMethod::Textfile {
        return Ok(true);
    }
    let Some(load_order_file) = settings.load_order_file() else {
        return Ok(true);
    };
    if !load_order_file.exists() || !settings.active_plugins_file().exists() {
        return Ok(true);
    }

    let active = persistence::parse_active_plugins_file(settings)?;
    let load_order = persistence::read_load_order_file(load_order_file)?;

    let active_keys: HashSet<String> = active.iter().map(|n| fold_name(n)).collect();
    let filtered: Vec<&String> = load_order
        .iter()
        .filter(|name| active_keys.contains(&fold_name(name)))
        .collect();

    Ok(filtered.len() == active.len()
        && filtered
            .iter()
            .zip(&active)
            .all(|(a, b)| names_match(a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::GameId;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn setup(game_id: GameId) -> (TempDir, GameSettings) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let settings = GameSettings::new(
            game_id,
            root.join("Data"),
            root.join("plugins.txt"),
            Some(root.join("loadorder.txt")),
        );
        (tmp, settings)
    }

    fn write_files(settings: &GameSettings, load_order: &str, active: &str) {
        std::fs::write(settings.load_order_file().unwrap(), load_order).unwrap();
        std::fs::write(settings.active_plugins_file(), active).unwrap();
    }

    #[test]
    fn test_timestamp_games_are_always_synchronised() {
        let (_tmp, settings) = setup(GameId::Tes4);
        assert!(is_synchronised(&settings).unwrap());
    }

    #[test]
    fn test_synchronised_when_either_file_is_absent() {
        let (_tmp, settings) = setup(GameId::Tes5);
        assert!(is_synchronised(&settings).unwrap());

        std::fs::write(settings.load_order_file().unwrap(), "Skyrim.esm\n").unwrap();
        assert!(is_synchronised(&settings).unwrap());

        std::fs::remove_file(settings.load_order_file().unwrap()).unwrap();
        std::fs::write(settings.active_plugins_file(), "Skyrim.esm\n").unwrap();
        assert!(is_synchronised(&settings).unwrap());
    }

    #[test]
    fn test_synchronised_when_active_lines_are_an_ordered_subsequence() {
        let (_tmp, settings) = setup(GameId::Tes5);
        write_files(
            &settings,
            "Skyrim.esm\nBlank.esm\nBlank.esp\n",
            "# comment\nskyrim.esm\nBlank.esp\n",
        );
        assert!(is_synchronised(&settings).unwrap());
    }

    #[test]
    fn test_not_synchronised_when_order_differs() {
        let (_tmp, settings) = setup(GameId::Tes5);
        write_files(
            &settings,
            "Skyrim.esm\nBlank.esm\nBlank.esp\n",
            "Blank.esp\nSkyrim.esm\n",
        );
        assert!(!is_synchronised(&settings).unwrap());
    }

    #[test]
    fn test_not_synchronised_when_active_name_is_missing_from_load_order() {
        let (_tmp, settings) = setup(GameId::Tes5);
        write_files(&settings, "Skyrim.esm\n", "Skyrim.esm\nBlank.esm\n");
        assert!(!is_synchronised(&settings).unwrap());
    }

    #[test]
    fn test_load_order_entries_missing_from_active_file_are_ignored() {
        let (_tmp, settings) = setup(GameId::Tes5);
        write_files(
            &settings,
            "Skyrim.esm\nUpdate.esm\nBlank.esm\nBlank.esp\n",
            "Skyrim.esm\nBlank.esp\n",
        );
        assert!(is_synchronised(&settings).unwrap());
    }
}
