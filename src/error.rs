//! Error types for the launcher runtime.
//!
//! Every variant corresponds to one bullet of the error taxonomy: archive
//! structure, argument parsing, I/O, namespace/mount, and execution. `main`
//! prints the top-level `Display` of whichever variant escapes and exits
//! with a nonzero status; there is no local recovery (each phase either
//! succeeds fully or aborts the process).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the launcher.
pub type Result<T> = std::result::Result<T, LauncherError>;

/// Top-level error type for the launcher runtime.
#[derive(Error, Debug)]
pub enum LauncherError {
    /// The embedded archive does not describe a valid bundle.
    #[error("{0}")]
    Archive(#[from] ArchiveError),

    /// The launcher argument slice could not be parsed.
    #[error("{0}")]
    Arg(#[from] ArgError),

    /// A filesystem operation failed.
    #[error("{0}")]
    Io(#[from] IoError),

    /// Namespace or mount setup failed.
    #[error("{0}")]
    Mount(#[from] MountError),

    /// The terminal hand-off to the entry point failed.
    #[error("{0}")]
    Exec(#[from] ExecError),
}

impl LauncherError {
    /// The one-line message this error should produce on stderr, prefixed
    /// per §7 ("a one-line `stderr` message beginning `PUISNE:`").
    pub fn stderr_line(&self) -> String {
        format!("PUISNE: {self}")
    }
}

/// Archive structure errors (§4.C, §7 "Archive structure").
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// A bare file sat at the top level of the archive.
    #[error("top level file outside any .app bundle: {0}")]
    TopLevelFile(String),

    /// A top-level directory did not end in `.app`.
    #[error("top level directory is not a .app bundle: {0}")]
    NotAnAppDirectory(String),

    /// The `.app` directory name was empty (a lone `.app/`).
    #[error("empty app name")]
    EmptyAppName,

    /// More than one distinct `.app` name was found at the top level.
    #[error("multiple top level app folders: {0} and {1}")]
    MultipleAppNames(String, String),

    /// Reading the archive's central directory failed.
    #[error("failed to read archive: {0}")]
    Read(#[from] zip::result::ZipError),
}

/// Argument parsing errors (§4.D, §4.E, §7 "Argument").
#[derive(Error, Debug)]
pub enum ArgError {
    /// An unrecognized flag was passed.
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    /// A flag that requires an argument was given none.
    #[error("missing argument for flag: {0}")]
    MissingArgument(String),

    /// A flag's argument was not one of its enumerated values.
    #[error("invalid value {value:?} for flag {flag}")]
    InvalidValue {
        /// The offending flag.
        flag: String,
        /// The value that was rejected.
        value: String,
    },

    /// A non-flag token appeared in the launcher slice.
    #[error("unexpected argument: {0}")]
    StrayToken(String),

    /// `-m` was requested but the platform does not support overlay mounts.
    #[error("overlay mount mode requested with -m but is not supported on this platform")]
    OverlayUnsupported,

    /// `clap` rejected the launcher slice.
    #[error("{0}")]
    Clap(String),
}

/// I/O errors (§7 "I/O").
#[derive(Error, Debug)]
pub enum IoError {
    /// The embedded help text could not be read.
    #[error("cannot read help text: {source}")]
    HelpText {
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An archive member could not be read.
    #[error("cannot read archive member {path}: {source}")]
    ReadMember {
        /// Member path within the bundle.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A destination file could not be written.
    #[error("cannot write {path}: {source}", path = path.display())]
    WriteDestination {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The destination directory, or one of its parents, could not be
    /// created.
    #[error("cannot create directory {path}: {source}", path = path.display())]
    CreateDirectory {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Namespace/mount errors (§4.G, §7 "Namespace/mount").
#[derive(Error, Debug)]
pub enum MountError {
    /// Unsharing the user/mount namespace failed.
    #[error("failed to unshare namespace: {0}")]
    Unshare(std::io::Error),

    /// Writing a `/proc/self/*` identity map failed.
    #[error("failed to write {path}: {source}")]
    IdentityMap {
        /// The proc file that was written to.
        path: &'static str,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The intermediate overlay mount (nested-path trick) failed.
    #[error("failed to establish intermediate overlay: {0}")]
    IntermediateMount(std::io::Error),

    /// The primary overlay mount failed.
    #[error("failed to mount overlay: {0}")]
    PrimaryMount(std::io::Error),

    /// Re-anchoring the current directory after mounting failed.
    #[error("failed to re-anchor current directory: {0}")]
    Reanchor(std::io::Error),
}

/// Execution errors (§4.H, §7 "Execution").
#[derive(Error, Debug)]
pub enum ExecError {
    /// The entry point is missing or not executable.
    #[error("failed to execute entry point {path}: {source}", path = path.display())]
    Entry {
        /// Resolved entry point path.
        path: PathBuf,
        /// Underlying I/O error (`exec` only returns on error).
        source: std::io::Error,
    },
}
