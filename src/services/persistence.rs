//! Reading and writing of the persisted load order files.
//!
//! Two file shapes exist: the load-order file (UTF-8, one filename per line,
//! textfile-based games only) and the active-plugins file (OS-local code
//! page, `#` comments, `GameFile<N>=` line prefixes on TES3). The
//! active-plugins format is notoriously malformed in the wild, so its parser
//! drops bad lines instead of failing; whole-file I/O errors still surface.
//!
//! All writes go through a temp-file-plus-rename so a crash mid-write never
//! leaves a truncated file behind.

use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use camino::Utf8Path;
use filetime::{set_file_mtime, FileTime};
use indexmap::IndexSet;
use regex::Regex;

use crate::encoding;
use crate::error::{Error, Result};
use crate::models::plugin::{fold_name, Plugin};
use crate::models::settings::GameSettings;
use crate::services::probe;

/// `GameFile<N>=<name>.esp|esm` — the TES3 active-line shape.
fn gamefile_line_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)^GameFile[0-9]+=(.+\.es[mp])$").expect("invalid GameFile regex")
    })
}

/// Filenames of the regular files in the plugins folder.
///
/// A missing folder reads as empty. Entries with non-UTF-8 names are skipped;
/// plugin names are UTF-8 internally by contract.
pub fn scan_plugins_folder(settings: &GameSettings) -> Result<Vec<String>> {
    let folder = settings.plugins_folder();
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(folder, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(folder, e))?;
        if !entry.file_type().map_err(|e| Error::io(folder, e))?.is_file() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    Ok(names)
}

/// Lines of the load-order file: one UTF-8 filename per line, no comments.
pub fn read_load_order_file(path: &Utf8Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Plugin names listed in the active-plugins file, decoded to UTF-8,
/// de-commented, de-prefixed and de-duplicated (first occurrence wins).
///
/// This is the lenient parse shared by `load` and the synchronisation check:
/// blank lines, comments and unparseable lines are dropped silently, and a
/// missing file reads as empty. Validity filtering and the active cap are the
/// caller's business.
pub fn parse_active_plugins_file(settings: &GameSettings) -> Result<Vec<String>> {
    let path = settings.active_plugins_file();
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(path, e)),
    };

    let content = encoding::bytes_to_utf8(&bytes);
    let mut seen: IndexSet<String> = IndexSet::new();
    let mut names = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let name = if settings.game_id().uses_gamefile_prefix() {
            match gamefile_line_regex().captures(line) {
                Some(captures) => captures[1].to_string(),
                None => {
                    tracing::debug!(line, "discarding unparseable active-plugins line");
                    continue;
                }
            }
        } else {
            line.to_string()
        };

        if seen.insert(fold_name(&name)) {
            names.push(name);
        }
    }

    Ok(names)
}

/// Write the load-order file: one UTF-8 filename per line, in order.
pub fn write_load_order_file(path: &Utf8Path, names: &[&str]) -> Result<()> {
    let mut content = String::new();
    for name in names {
        content.push_str(name);
        content.push('\n');
    }
    atomic_write(path, content.as_bytes())
}

/// Write the active-plugins file: one name per line in load-order order,
/// OS-local code page, `GameFile<N>=` prefixes for TES3.
pub fn write_active_plugins_file(settings: &GameSettings, names: &[&str]) -> Result<()> {
    let mut bytes = Vec::new();
    for (index, name) in names.iter().enumerate() {
        if settings.game_id().uses_gamefile_prefix() {
            bytes.extend_from_slice(format!("GameFile{index}=").as_bytes());
        }
        bytes.extend_from_slice(&encoding::utf8_to_bytes(name)?);
        bytes.push(b'\n');
    }
    atomic_write(settings.active_plugins_file(), &bytes)
}

/// Stamp each plugin file with `base + index * 60s`, where base is the
/// earliest modification time currently in the order. A later folder scan
/// sorted by mtime reproduces this order exactly.
pub fn stamp_plugin_files(plugins: &[Plugin], settings: &GameSettings) -> Result<()> {
    let base = plugins
        .iter()
        .map(Plugin::modified)
        .min()
        .unwrap_or_else(SystemTime::now);

    for (index, plugin) in plugins.iter().enumerate() {
        let path = probe::resolve_path(plugin.name(), settings).ok_or_else(|| {
            Error::io(
                settings.plugin_path(plugin.name()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "plugin file not found"),
            )
        })?;

        let stamp = base + Duration::from_secs(60 * index as u64);
        set_file_mtime(&path, FileTime::from_system_time(stamp))
            .map_err(|e| Error::io(path, e))?;
    }

    tracing::debug!(count = plugins.len(), "stamped plugin timestamps");
    Ok(())
}

/// Replace `path` atomically: write a sibling temp file, then rename it over
/// the target. Parent directories are created if absent.
fn atomic_write(path: &Utf8Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Utf8Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io(parent, e))?;
    temp.write_all(bytes).map_err(|e| Error::io(path, e))?;
    temp.persist(path)
        .map_err(|e| Error::io(path, e.error))?;
    Ok(())
}
