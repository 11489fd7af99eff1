//! Option parser (§4.E) and the resolved [`Configuration`] (§3).

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::error::ArgError;
use crate::paths;
use crate::platform::Platform;

/// Overlay mode (§3 `mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Establish a mount-namespace overlay before execution.
    Mount,
    /// Extract (if at all) without overlaying.
    None,
}

/// Which of (destination, invocation directory) is the overlay's writable
/// upper layer (§3 `overlay_orientation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OverlayOrientation {
    /// Destination is upper, invocation directory is lower.
    Over,
    /// Invocation directory is upper, destination is lower.
    Under,
}

/// Per-entry extraction policy (§3 `unzip_policy`, §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnzipPolicy {
    /// Always overwrite or create.
    All,
    /// Create only if missing; never overwrite.
    New,
    /// Overwrite only if present; never create.
    Existing,
    /// Overwrite if archive is newer; create if missing.
    Update,
    /// Overwrite if archive is newer; never create.
    Freshen,
    /// Do not invoke the extractor at all.
    None,
}

/// Launcher flags, parsed from the partitioned + `.args`-merged launcher
/// slice (§4.E). Field names mirror the flags themselves; a synthetic
/// `argv[0]` is prepended by the caller so clap's usage output renders
/// sensibly.
#[derive(Parser, Debug)]
#[command(name = "puisne", disable_help_flag = true, disable_version_flag = true)]
struct RawArgs {
    /// Overlay orientation: over | under.
    #[arg(short = 'o')]
    orientation: Option<OverlayOrientation>,

    /// Extraction policy: all | new | existing | update | freshen | none.
    #[arg(short = 'u')]
    unzip: Option<UnzipPolicy>,

    /// Destination directory.
    #[arg(short = 'd')]
    destination: Option<PathBuf>,

    /// Work directory.
    #[arg(short = 'w')]
    work_dir: Option<PathBuf>,

    /// Print help and exit 0.
    #[arg(short = 'h')]
    help: bool,
}

/// The fully resolved launcher configuration (§3), immutable once built.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Overlay mode.
    pub mode: Mode,
    /// Overlay orientation (meaningful only when `mode == Mode::Mount`).
    pub overlay_orientation: OverlayOrientation,
    /// Per-entry extraction policy.
    pub unzip_policy: UnzipPolicy,
    /// Absolute destination path.
    pub destination: PathBuf,
    /// Absolute work directory path.
    pub work_dir: PathBuf,
    /// Whether `-h` was passed.
    pub help_requested: bool,
}

/// Parses the launcher slice and resolves it into a [`Configuration`],
/// applying the platform- and mode-dependent defaults from §3.
pub fn resolve(
    launcher_args: &[String],
    platform: &Platform,
    invocation_dir: &Path,
    bundle_name: &str,
) -> Result<Configuration, ArgError> {
    // `-m`/`-n` are plain boolean flags to clap, which discards the order
    // they were seen in — but §4.E requires "later occurrences override
    // earlier ones", which matters once a `.args` default like `-n` is
    // followed by a CLI-supplied `-m` (§4.D's `...` splice). So the mode
    // flags are scanned and stripped here, ahead of clap, rather than
    // parsed as struct fields.
    let (mode_override, rest) = take_mode_override(launcher_args);

    let mut argv = vec!["puisne".to_string()];
    argv.extend(rest.iter().cloned());

    let raw = RawArgs::try_parse_from(&argv).map_err(|e| classify_clap_error(e, &rest))?;

    let requested_mount = matches!(mode_override, Some(Mode::Mount));
    if requested_mount && !platform.supports_overlay_mount {
        return Err(ArgError::OverlayUnsupported);
    }

    let mode = mode_override.unwrap_or(if platform.supports_overlay_mount {
        Mode::Mount
    } else {
        Mode::None
    });

    let overlay_orientation = raw.orientation.unwrap_or(OverlayOrientation::Over);
    let unzip_policy = raw.unzip.unwrap_or(UnzipPolicy::Update);

    let destination = match raw.destination {
        Some(p) => resolve_user_path(&p)?,
        None => default_destination(mode, invocation_dir, bundle_name),
    };

    let work_dir = match raw.work_dir {
        Some(p) => resolve_user_path(&p)?,
        None => default_work_dir(invocation_dir)?,
    };

    Ok(Configuration {
        mode,
        overlay_orientation,
        unzip_policy,
        destination,
        work_dir,
        help_requested: raw.help,
    })
}

/// Scans `launcher_args` in order for `-m`/`-n`, returning the mode of the
/// *last* occurrence of either (§4.E: "Later occurrences override earlier
/// ones") along with the remaining tokens for `clap` to parse.
fn take_mode_override(launcher_args: &[String]) -> (Option<Mode>, Vec<String>) {
    let mut mode = None;
    let mut rest = Vec::with_capacity(launcher_args.len());
    for arg in launcher_args {
        match arg.as_str() {
            "-m" => mode = Some(Mode::Mount),
            "-n" => mode = Some(Mode::None),
            _ => rest.push(arg.clone()),
        }
    }
    (mode, rest)
}

fn resolve_user_path(p: &Path) -> Result<PathBuf, ArgError> {
    let expanded = paths::expand_tilde(p);
    paths::absolutize(&expanded).map_err(|e| ArgError::InvalidValue {
        flag: "-d/-w".to_string(),
        value: format!("{}: {e}", p.display()),
    })
}

fn default_destination(mode: Mode, invocation_dir: &Path, bundle_name: &str) -> PathBuf {
    match mode {
        Mode::Mount => invocation_dir
            .join(".puisne")
            .join(format!("{bundle_name}.app")),
        Mode::None => invocation_dir.to_path_buf(),
    }
}

fn default_work_dir(invocation_dir: &Path) -> Result<PathBuf, ArgError> {
    tempfile::Builder::new()
        .prefix("puisne.")
        .tempdir_in(invocation_dir)
        .map(|dir| dir.keep())
        .map_err(|e| ArgError::InvalidValue {
            flag: "-w".to_string(),
            value: format!("could not create a work directory: {e}"),
        })
}

/// Maps a `clap` parse failure onto the taxonomy in §4.E / §7: unknown
/// flag, missing argument, invalid enumerated value, or stray token.
fn classify_clap_error(err: clap::Error, launcher_args: &[String]) -> ArgError {
    use clap::error::{ContextKind, ContextValue, ErrorKind};

    // clap records the exact offending token under `InvalidArg`; prefer it
    // over re-deriving it from `launcher_args`, which can't tell a stray
    // value apart from a genuine flag.
    let invalid_arg = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(s)) => Some(s.clone()),
        _ => None,
    };

    match err.kind() {
        // A token that doesn't start with `-` is a stray positional
        // (there are none in this grammar); one that does is a genuinely
        // unrecognized flag. clap reports both as `UnknownArgument`.
        ErrorKind::UnknownArgument => {
            let offender = invalid_arg.unwrap_or_default();
            if offender.starts_with('-') {
                ArgError::UnknownFlag(offender)
            } else {
                ArgError::StrayToken(offender)
            }
        }
        ErrorKind::MissingRequiredArgument | ErrorKind::InvalidValue
            if err.to_string().contains("requires a value") =>
        {
            ArgError::MissingArgument(invalid_arg.unwrap_or_else(|| launcher_args.join(" ")))
        }
        ErrorKind::ValueValidation | ErrorKind::InvalidValue => ArgError::InvalidValue {
            flag: invalid_arg.unwrap_or_else(|| launcher_args.join(" ")),
            value: err.to_string(),
        },
        ErrorKind::TooManyValues | ErrorKind::UnexpectedMultipleUsage => {
            ArgError::StrayToken(invalid_arg.unwrap_or_else(|| launcher_args.join(" ")))
        }
        _ => ArgError::Clap(err.to_string()),
    }
}
