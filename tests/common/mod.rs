//! Shared fixtures for the integration tests.
//!
//! Builds a throwaway game installation: a plugins folder with synthetic but
//! structurally real plugin files, plus the persisted-file paths the engine
//! reads and writes.
#![allow(dead_code)]

use camino::Utf8PathBuf;
use filetime::{set_file_mtime, FileTime};
use loadorder::{GameId, GameSettings};
use tempfile::TempDir;

/// Settings rooted in a fresh temp directory, plugins folder created.
pub fn game_fixture(game_id: GameId) -> (TempDir, GameSettings) {
    let tmp = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
    let settings = GameSettings::new(
        game_id,
        root.join("Data"),
        root.join("plugins.txt"),
        Some(root.join("loadorder.txt")),
    );
    std::fs::create_dir_all(settings.plugins_folder()).unwrap();
    (tmp, settings)
}

/// Write a minimal plugin file: the right header magic for the game, with
/// the master flag bit set as asked.
pub fn write_plugin(settings: &GameSettings, name: &str, is_master: bool) {
    let magic: &[u8; 4] = if settings.game_id() == GameId::Tes3 {
        b"TES3"
    } else {
        b"TES4"
    };
    let mut bytes = Vec::from(*magic);
    bytes.extend_from_slice(&28u32.to_le_bytes());
    bytes.extend_from_slice(&u32::from(is_master).to_le_bytes());
    bytes.extend_from_slice(&[0; 28]);
    std::fs::write(settings.plugin_path(name), bytes).unwrap();
}

/// The standard plugin population used by most tests.
pub fn populate_plugins_folder(settings: &GameSettings) {
    write_plugin(settings, settings.master_file(), true);
    write_plugin(settings, "Blank.esm", true);
    write_plugin(settings, "Blank - Different.esm", true);
    write_plugin(settings, "Blank.esp", false);
    write_plugin(settings, "Blank - Different.esp", false);
    if settings.game_id() == GameId::Tes5 {
        write_plugin(settings, "Update.esm", true);
    }
    std::fs::write(
        settings.plugin_path("NotAPlugin.esm"),
        "This isn't a valid plugin file.",
    )
    .unwrap();
}

/// Stamp each named plugin file one minute apart, in the given order.
pub fn set_timestamps(settings: &GameSettings, names: &[&str]) {
    for (index, name) in names.iter().enumerate() {
        set_file_mtime(
            settings.plugin_path(name),
            FileTime::from_unix_time(1_500_000_000 + 60 * index as i64, 0),
        )
        .unwrap();
    }
}

/// Write the active-plugins file from raw UTF-8 lines, encoding each line as
/// Windows-1252 and applying the TES3 `GameFile<N>=` prefix.
pub fn write_active_plugins_file(settings: &GameSettings, names: &[&str]) {
    let mut bytes = Vec::new();
    for (index, name) in names.iter().enumerate() {
        if settings.game_id() == GameId::Tes3 {
            bytes.extend_from_slice(format!("GameFile{index}=").as_bytes());
        }
        let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(name);
        bytes.extend_from_slice(&encoded);
        bytes.push(b'\n');
    }
    std::fs::write(settings.active_plugins_file(), bytes).unwrap();
}

/// Write the load-order file as plain UTF-8 lines.
pub fn write_load_order_file(settings: &GameSettings, names: &[&str]) {
    let mut content = String::new();
    for name in names {
        content.push_str(name);
        content.push('\n');
    }
    std::fs::write(settings.load_order_file().unwrap(), content).unwrap();
}
