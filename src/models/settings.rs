use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// The update master that TES5 treats as a required second master when it is
/// installed.
pub const UPDATE_MASTER: &str = "Update.esm";

/// Filename extension that conventionally marks a plugin as a master.
pub const MASTER_EXTENSION: &str = ".esm";

/// Supported games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameId {
    Tes3,
    Tes4,
    Tes5,
    Fo3,
    Fnv,
}

impl GameId {
    /// How the game persists its load order.
    pub fn load_order_method(self) -> LoadOrderMethod {
        match self {
            GameId::Tes5 => LoadOrderMethod::Textfile,
            _ => LoadOrderMethod::Timestamp,
        }
    }

    /// The game's canonical primary master file.
    pub fn default_master_file(self) -> &'static str {
        match self {
            GameId::Tes3 => "Morrowind.esm",
            GameId::Tes4 => "Oblivion.esm",
            GameId::Tes5 => "Skyrim.esm",
            GameId::Fo3 => "Fallout3.esm",
            GameId::Fnv => "FalloutNV.esm",
        }
    }

    /// Whether the game's active-plugins file uses `GameFile<N>=` line
    /// prefixes.
    pub fn uses_gamefile_prefix(self) -> bool {
        self == GameId::Tes3
    }
}

/// The two persistence strategies found in the wild.
///
/// Textfile-based games keep an explicit ordered list in a text file;
/// timestamp-based games infer order from plugin file modification times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadOrderMethod {
    Textfile,
    Timestamp,
}

/// Read-only description of one game installation.
///
/// Consumers build this from whatever configuration store they use; the
/// engine only ever reads it. All paths are supplied by the caller, the
/// engine never invents its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    game_id: GameId,
    method: LoadOrderMethod,
    master_file: String,
    plugins_folder: Utf8PathBuf,
    active_plugins_file: Utf8PathBuf,
    load_order_file: Option<Utf8PathBuf>,
}

impl GameSettings {
    /// Create settings for a game, using the game's default master file.
    ///
    /// `load_order_file` is only meaningful for textfile-based games and may
    /// be `None` otherwise.
    pub fn new(
        game_id: GameId,
        plugins_folder: impl Into<Utf8PathBuf>,
        active_plugins_file: impl Into<Utf8PathBuf>,
        load_order_file: Option<Utf8PathBuf>,
    ) -> Self {
        Self {
            game_id,
            method: game_id.load_order_method(),
            master_file: game_id.default_master_file().to_string(),
            plugins_folder: plugins_folder.into(),
            active_plugins_file: active_plugins_file.into(),
            load_order_file,
        }
    }

    /// Override the master filename, for total-conversion setups that rename
    /// the primary master.
    pub fn with_master_file(mut self, master_file: impl Into<String>) -> Self {
        self.master_file = master_file.into();
        self
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn method(&self) -> LoadOrderMethod {
        self.method
    }

    /// The game's canonical primary master, e.g. `Skyrim.esm`.
    pub fn master_file(&self) -> &str {
        &self.master_file
    }

    pub fn plugins_folder(&self) -> &Utf8Path {
        &self.plugins_folder
    }

    pub fn active_plugins_file(&self) -> &Utf8Path {
        &self.active_plugins_file
    }

    pub fn load_order_file(&self) -> Option<&Utf8Path> {
        self.load_order_file.as_deref()
    }

    /// Full path of a plugin inside the plugins folder.
    pub fn plugin_path(&self, plugin_name: &str) -> Utf8PathBuf {
        self.plugins_folder.join(plugin_name)
    }

    /// Whether `name` is this game's master file, case-insensitively.
    pub fn is_master_file(&self, name: &str) -> bool {
        crate::models::plugin::names_match(&self.master_file, name)
    }

    /// Whether `name` must always stay active for this game.
    ///
    /// Textfile-based games require their master file active; TES5
    /// additionally requires `Update.esm` active whenever it is installed.
    pub fn is_implicitly_active(&self, name: &str) -> bool {
        (self.method == LoadOrderMethod::Textfile && self.is_master_file(name))
            || (self.game_id == GameId::Tes5
                && crate::models::plugin::names_match(UPDATE_MASTER, name))
    }
}
