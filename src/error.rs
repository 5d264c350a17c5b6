use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by load order operations.
///
/// Mutators fail fast: when any of these is returned the in-memory state is
/// exactly what it was before the call.
#[derive(Error, Debug)]
pub enum Error {
    /// The given plugin sequence names the same plugin more than once
    /// (comparison is case-insensitive).
    #[error("the plugin \"{0}\" appears more than once in the given load order")]
    DuplicatePlugin(String),

    /// A non-master plugin was placed before a master plugin.
    #[error("attempted to load a non-master plugin before a master plugin")]
    NonMasterBeforeMaster,

    /// For textfile-based games the game's master file must occupy the first
    /// position, and nothing else may be put there.
    #[error("the game's master file must load before all other plugins")]
    MasterMustLoadFirst,

    /// The named file is missing from the plugins folder or was rejected by
    /// the plugin validator.
    #[error("the plugin file \"{0}\" is invalid")]
    InvalidPlugin(String),

    /// Activating the plugin would push the active count past the limit.
    #[error("maximum number of active plugins exceeded")]
    TooManyActivePlugins,

    /// The named plugin is required to stay active for the configured game.
    #[error("the plugin \"{0}\" is required by the game and cannot be deactivated")]
    ForbiddenDeactivation(String),

    /// A position lookup was made past the end of the load order.
    #[error("the load order has no plugin at position {0}")]
    OutOfRange(usize),

    /// Text could not be represented in the OS-local code page on write.
    #[error("\"{0}\" cannot be encoded in Windows-1252")]
    Encode(String),

    /// A filesystem read or write failed.
    #[error("I/O error on \"{path}\": {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Attach a path to a raw I/O error.
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
