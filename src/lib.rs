//! PUISNE: a self-extracting, self-executing single-file application bundle
//! launcher.
//!
//! A PUISNE binary is a small launcher stub with a ZIP archive appended to
//! it. The archive holds a `<name>.app/` directory containing an entry
//! point named `<name>`, plus arbitrary resource files. Invoked, the
//! launcher partitions its arguments, validates and classifies the
//! embedded archive, optionally extracts files to a destination, optionally
//! overlays the extraction onto its own directory via a mount namespace,
//! and finally replaces its own process image with the entry point.
//!
//! [`plan_handoff`] is the library seam: it performs every phase up to but
//! not including the terminal `exec`, returning a [`Handoff`] describing
//! the would-be child instead of replacing the process image, so the whole
//! pipeline is testable without ever actually forking into a packaged
//! program.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod args;
pub mod config;
pub mod error;
pub mod extract;
pub mod launcher;
pub mod manifest;
pub mod overlay;
pub mod paths;
pub mod platform;

pub use config::{Configuration, Mode, OverlayOrientation, UnzipPolicy};
pub use error::{ArchiveError, ArgError, ExecError, IoError, LauncherError, MountError, Result};
pub use launcher::Handoff;
pub use manifest::{ArchiveOutcome, Manifest, ManifestEntry};
pub use platform::Platform;

use std::path::{Path, PathBuf};

const RESERVED_HELP_TEXT: &str = "puisne/help.txt";
const RESERVED_ARGS_FILE: &str = ".args";

/// What [`plan_handoff`] produced, short of the terminal `exec` itself.
#[derive(Debug)]
pub enum Outcome {
    /// The archive held no `<name>.app/` directory (§4.C). Not an error:
    /// the caller should print `message` and the embedded help text, then
    /// exit 0.
    EmptyBundle {
        /// A short, human-readable note explaining the empty-bundle case.
        message: String,
        /// The embedded help text, if the archive carried one.
        help_text: Option<String>,
    },
    /// `-h` was present in the resolved launcher slice. The caller should
    /// print the embedded help text and exit 0.
    HelpRequested {
        /// The embedded help text, if the archive carried one.
        help_text: Option<String>,
    },
    /// Extraction (and, on Unix, the overlay) succeeded; `handoff`
    /// describes the child that would be exec'd.
    Handoff(Handoff),
}

/// Runs every phase of the launcher (§2 components D through H, minus the
/// terminal `exec`) against `argv`, the process's own argument vector
/// including `argv[0]`.
pub fn plan_handoff(argv: &[String]) -> error::Result<Outcome> {
    let binary_path = resolve_binary_path(argv);
    let invocation_dir = binary_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let partitioned = args::partition_cli(argv);

    let mut archive = manifest::Archive::open(&binary_path)?;
    let outcome = archive.build_manifest()?;

    let manifest = match outcome {
        manifest::ArchiveOutcome::Empty => {
            let help_text = read_help_text(&mut archive)?;
            return Ok(Outcome::EmptyBundle {
                message: "This is an empty PUISNE binary: it carries no application bundle."
                    .to_string(),
                help_text,
            });
        }
        manifest::ArchiveOutcome::Bundle(manifest) => manifest,
    };

    let args_file_tokens = archive
        .read_member(RESERVED_ARGS_FILE)?
        .map(|bytes| args::parse_args_file(&String::from_utf8_lossy(&bytes)));
    let launcher_args = args::merge_launcher_args(partitioned.launcher_args, args_file_tokens);

    let platform = platform::Platform::probe();
    let configuration = config::resolve(&launcher_args, &platform, &invocation_dir, &manifest.name)?;

    if configuration.help_requested {
        let help_text = read_help_text(&mut archive)?;
        return Ok(Outcome::HelpRequested { help_text });
    }

    extract::extract(
        &mut archive,
        &manifest,
        &configuration.destination,
        configuration.unzip_policy,
    )?;

    establish_overlay_if_needed(&configuration, &invocation_dir)?;

    let handoff = launcher::plan(
        configuration.mode,
        &invocation_dir,
        &configuration.destination,
        &manifest.name,
        &partitioned.passthrough,
    )?;

    Ok(Outcome::Handoff(handoff))
}

#[cfg(unix)]
fn establish_overlay_if_needed(
    configuration: &Configuration,
    invocation_dir: &Path,
) -> error::Result<()> {
    if configuration.mode != Mode::Mount {
        return Ok(());
    }
    let request = overlay::OverlayRequest {
        invocation_dir,
        destination: &configuration.destination,
        orientation: configuration.overlay_orientation,
        work_dir: &configuration.work_dir,
    };
    overlay::establish(&request)?;
    Ok(())
}

#[cfg(not(unix))]
fn establish_overlay_if_needed(
    _configuration: &Configuration,
    _invocation_dir: &Path,
) -> error::Result<()> {
    Ok(())
}

/// Reads the embedded help text, routing any failure through
/// [`error::IoError::HelpText`] (§7 "cannot read help text") rather than
/// the underlying archive error directly.
fn read_help_text(archive: &mut manifest::Archive) -> error::Result<Option<String>> {
    match archive.read_member(RESERVED_HELP_TEXT) {
        Ok(Some(bytes)) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Ok(None) => Ok(None),
        Err(source) => Err(error::IoError::HelpText {
            source: std::io::Error::other(source),
        }
        .into()),
    }
}

/// Resolves the path to the running launcher binary from `argv[0]`,
/// falling back to [`std::env::current_exe`] if `argv[0]` cannot be
/// resolved (e.g. it was a bare name looked up on `PATH`).
fn resolve_binary_path(argv: &[String]) -> PathBuf {
    argv.first()
        .map(PathBuf::from)
        .and_then(|p| paths::realpath(&p).ok())
        .or_else(|| std::env::current_exe().ok())
        .unwrap_or_else(|| PathBuf::from(argv.first().cloned().unwrap_or_default()))
}
