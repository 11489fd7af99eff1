//! Terminal hand-off (§4.H).
//!
//! Resolves the entry point inside whichever directory now holds the
//! bundle's files, builds the child argument vector, and replaces the
//! process image. This function never returns on success.

use std::path::{Path, PathBuf};

use crate::config::Mode;
use crate::error::ExecError;
use crate::paths;

/// A fully resolved hand-off, computed but not yet performed. Exists so
/// tests can exercise the resolution logic without actually replacing the
/// process image; [`perform`] is the only caller that invokes `exec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    /// The resolved, canonical entry point path.
    pub entry: PathBuf,
    /// The full child argument vector, including argument 0.
    pub argv: Vec<String>,
}

/// Computes `run_dir` and the resolved entry point (§4.H, first paragraph).
pub fn plan(
    mode: Mode,
    invocation_dir: &Path,
    destination: &Path,
    bundle_name: &str,
    passthrough: &[String],
) -> Result<Handoff, ExecError> {
    let run_dir = match mode {
        Mode::None => destination,
        Mode::Mount => invocation_dir,
    };

    let candidate = paths::join(run_dir, bundle_name);
    let entry = paths::realpath(&candidate).map_err(|source| ExecError::Entry {
        path: candidate.clone(),
        source,
    })?;

    let argv = build_argv(&entry, passthrough);

    Ok(Handoff { entry, argv })
}

#[cfg(unix)]
fn build_argv(entry: &Path, passthrough: &[String]) -> Vec<String> {
    let mut argv = vec![entry.display().to_string()];
    argv.extend(passthrough.iter().cloned());
    argv
}

#[cfg(windows)]
fn build_argv(entry: &Path, passthrough: &[String]) -> Vec<String> {
    let system_dir = std::env::var("SystemRoot").unwrap_or_else(|_| "C:\\Windows".to_string());
    let cmd = format!("{system_dir}\\System32\\cmd.exe");
    let mut argv = vec![cmd, "/C".to_string(), entry.display().to_string()];
    argv.extend(passthrough.iter().cloned());
    argv
}

/// Performs the hand-off. On Unix this replaces the process image via
/// `exec` and never returns on success. On Windows, which has no process
/// image replacement, it spawns the child and forwards its exit code by
/// terminating the current process with the same status.
pub fn perform(handoff: &Handoff) -> Result<(), ExecError> {
    exec_impl(handoff)
}

#[cfg(unix)]
fn exec_impl(handoff: &Handoff) -> Result<(), ExecError> {
    use std::os::unix::process::CommandExt;
    use std::process::Command;

    let err = Command::new(&handoff.argv[0])
        .args(&handoff.argv[1..])
        .exec();
    Err(ExecError::Entry {
        path: handoff.entry.clone(),
        source: err,
    })
}

#[cfg(windows)]
fn exec_impl(handoff: &Handoff) -> Result<(), ExecError> {
    use std::process::Command;

    let status = Command::new(&handoff.argv[0])
        .args(&handoff.argv[1..])
        .status()
        .map_err(|source| ExecError::Entry {
            path: handoff.entry.clone(),
            source,
        })?;

    std::process::exit(status.code().unwrap_or(1));
}
