//! Namespace overlayer (§4.G), Unix only.
//!
//! Unshares a user+mount namespace, maps the calling UID/GID to root inside
//! it, composes the overlay mount (with the nested-path intermediate
//! overlay trick when needed), drops back to the caller's identity view,
//! and re-anchors the current working directory.

use std::ffi::CString;
use std::fs;
use std::path::{Path, PathBuf};

use rustix::mount::MountFlags;
use rustix::thread::UnshareFlags;

use crate::config::OverlayOrientation;
use crate::error::MountError;
use crate::paths;

/// Inputs to the overlayer, mirroring §4.G.
pub struct OverlayRequest<'a> {
    /// Directory containing the running launcher binary; also the mount
    /// target, so the entry point observes the overlayed view once exec'd.
    pub invocation_dir: &'a Path,
    /// Where extraction wrote files.
    pub destination: &'a Path,
    /// Which side is the writable upper layer.
    pub orientation: OverlayOrientation,
    /// Scratch directory on the same volume as the launcher.
    pub work_dir: &'a Path,
}

/// Establishes the overlay described by `request`. Only called when
/// `mode == Mode::Mount`.
pub fn establish(request: &OverlayRequest<'_>) -> Result<(), MountError> {
    let (upper, lower) = match request.orientation {
        OverlayOrientation::Over => (
            request.destination.to_path_buf(),
            request.invocation_dir.to_path_buf(),
        ),
        OverlayOrientation::Under => (
            request.invocation_dir.to_path_buf(),
            request.destination.to_path_buf(),
        ),
    };

    // Overlayfs requires upperdir/workdir to exist even when the extractor
    // was skipped entirely (unzip_policy = none with mode = mount).
    fs::create_dir_all(&upper).map_err(MountError::PrimaryMount)?;
    fs::create_dir_all(request.work_dir).map_err(MountError::PrimaryMount)?;

    let uid = rustix::process::getuid();
    let gid = rustix::process::getgid();
    let unprivileged = uid.as_raw() != 0 || gid.as_raw() != 0;

    if unprivileged {
        unshare_into_root(uid.as_raw(), gid.as_raw())?;
    }

    let (effective_lower, effective_work_dir) =
        resolve_nested_overlay(&lower, &upper, request.work_dir)?;

    mount_overlay(
        request.invocation_dir,
        &upper,
        &effective_lower,
        &effective_work_dir,
    )?;

    if unprivileged {
        restore_identity_view(uid.as_raw(), gid.as_raw())?;
    }

    reanchor_cwd()?;

    Ok(())
}

/// The unprivileged root trick: unshare a new user+mount namespace and map
/// the caller to UID/GID 0 inside it.
fn unshare_into_root(uid: u32, gid: u32) -> Result<(), MountError> {
    rustix::thread::unshare(UnshareFlags::NEWUSER | UnshareFlags::NEWNS)
        .map_err(|e| MountError::Unshare(e.into()))?;

    write_proc_self("/proc/self/uid_map", format!("0 {uid} 1\n"))?;
    write_proc_self("/proc/self/setgroups", "deny".to_string())?;
    write_proc_self("/proc/self/gid_map", format!("0 {gid} 1\n"))?;
    Ok(())
}

/// Privilege re-drop: a second `unshare(CLONE_NEWUSER)` (without
/// `CLONE_NEWNS`) followed by identity-preserving map writes. Preserved
/// verbatim per §9's open question about whether this reliably
/// re-establishes the prior identity across kernels.
fn restore_identity_view(uid: u32, gid: u32) -> Result<(), MountError> {
    rustix::thread::unshare(UnshareFlags::NEWUSER).map_err(|e| MountError::Unshare(e.into()))?;

    write_proc_self("/proc/self/uid_map", format!("{uid} 0 1\n"))?;
    write_proc_self("/proc/self/gid_map", format!("{gid} 0 1\n"))?;
    Ok(())
}

fn write_proc_self(path: &'static str, contents: String) -> Result<(), MountError> {
    fs::write(path, contents).map_err(|source| MountError::IdentityMap { path, source })
}

/// The nested-path intermediate overlay trick (§4.G): if `lower` lives
/// inside `upper`, mounting the real overlay directly on the invocation
/// directory would create a mount cycle. Instead, mount an intermediate
/// overlay whose lower layer is the real `lower`, then point the primary
/// mount's lower layer at the intermediate mount instead.
fn resolve_nested_overlay(
    lower: &Path,
    upper: &Path,
    work_dir: &Path,
) -> Result<(PathBuf, PathBuf), MountError> {
    let nested = paths::is_prefix(upper, lower).unwrap_or(false);
    if !nested {
        return Ok((lower.to_path_buf(), work_dir.to_path_buf()));
    }

    let inter_mnt = work_dir.join("inter.mnt");
    let inter_wrk = work_dir.join("inter.wrk");
    fs::create_dir_all(&inter_mnt).map_err(MountError::IntermediateMount)?;
    fs::create_dir_all(&inter_wrk).map_err(MountError::IntermediateMount)?;

    let data = format!(
        "upperdir={},lowerdir={},workdir={}",
        inter_mnt.display(),
        lower.display(),
        inter_wrk.display()
    );
    do_mount(&inter_mnt, &data).map_err(MountError::IntermediateMount)?;

    let new_work_dir = work_dir.join("over.wrk");
    fs::create_dir_all(&new_work_dir).map_err(MountError::IntermediateMount)?;

    Ok((inter_mnt, new_work_dir))
}

/// The primary overlay mount, always targeting `invocation_dir` so that the
/// entry point observes the overlayed view after exec.
fn mount_overlay(
    invocation_dir: &Path,
    upper: &Path,
    lower: &Path,
    work_dir: &Path,
) -> Result<(), MountError> {
    let data = format!(
        "upperdir={},lowerdir={},workdir={}",
        upper.display(),
        lower.display(),
        work_dir.display()
    );
    do_mount(invocation_dir, &data).map_err(MountError::PrimaryMount)
}

fn do_mount(target: &Path, data: &str) -> Result<(), std::io::Error> {
    let data = CString::new(data).map_err(std::io::Error::other)?;
    rustix::mount::mount(
        "overlay",
        target,
        "overlay",
        MountFlags::empty(),
        Some(data.as_c_str()),
    )
    .map_err(std::io::Error::from)
}

/// Re-anchors the working directory after the namespace switch so relative
/// paths resolved before `unshare` keep working afterward.
fn reanchor_cwd() -> Result<(), MountError> {
    let cwd = std::env::current_dir().map_err(MountError::Reanchor)?;
    std::env::set_current_dir(&cwd).map_err(MountError::Reanchor)
}
