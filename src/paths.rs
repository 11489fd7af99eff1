//! Path utilities (§4.B): tilde expansion, absolutizing, realpath, and
//! prefix testing. All functions here are pure with respect to their
//! arguments and the ambient environment/filesystem they read.

use std::path::{Path, PathBuf};

use path_absolutize::Absolutize;

/// Replaces a leading `~` with the user's home directory, unless a literal
/// directory named `~` exists in the current working directory (in which
/// case the path refers to that directory, not home).
pub fn expand_tilde(p: &Path) -> PathBuf {
    let Some(stripped) = strip_tilde_prefix(p) else {
        return p.to_path_buf();
    };
    if Path::new("~").is_dir() {
        return p.to_path_buf();
    }
    match home_dir() {
        Some(home) => {
            if stripped.as_os_str().is_empty() {
                home
            } else {
                home.join(stripped)
            }
        }
        None => p.to_path_buf(),
    }
}

/// Splits a leading `~` (optionally followed by `/...`) off `p`, returning
/// the remainder. Returns `None` if `p` does not start with `~`.
fn strip_tilde_prefix(p: &Path) -> Option<PathBuf> {
    let s = p.to_str()?;
    let rest = s.strip_prefix('~')?;
    let rest = rest.strip_prefix(std::path::MAIN_SEPARATOR).unwrap_or(rest);
    Some(PathBuf::from(rest))
}

/// The user's home directory: `HOME` on POSIX, `userprofile` on Windows,
/// falling back to `dirs::home_dir()` when the environment variable is
/// unset.
fn home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "userprofile" } else { "HOME" };
    std::env::var_os(var)
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

/// Makes `p` absolute without requiring it to exist on disk (needed for
/// `-d`/`-w`, which may name a destination that extraction has not yet
/// created).
pub fn absolutize(p: &Path) -> std::io::Result<PathBuf> {
    Ok(p.absolutize()?.into_owned())
}

/// Resolves `p` to its canonical absolute form, following symlinks. Unlike
/// [`absolutize`], this requires `p` to exist.
pub fn realpath(p: &Path) -> std::io::Result<PathBuf> {
    std::fs::canonicalize(p)
}

/// True iff canonicalized `a` is `b` or a proper path-component ancestor of
/// `b`. Both paths are canonicalized internally, so relative paths and
/// symlinks are resolved before comparison.
pub fn is_prefix(a: &Path, b: &Path) -> std::io::Result<bool> {
    let a = realpath(a)?;
    let b = realpath(b)?;
    Ok(b.starts_with(&a))
}

/// Joins `base` with a manifest-relative path, guarding against absolute
/// components in `relative` escaping `base` (archives are trusted input per
/// spec, but this keeps the join total and predictable).
pub fn join(base: &Path, relative: &str) -> PathBuf {
    let mut out = base.to_path_buf();
    for component in Path::new(relative).components() {
        use std::path::Component;
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                out.pop();
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_rejects_parent_escape() {
        let base = Path::new("/dest");
        assert_eq!(join(base, "../etc/passwd"), Path::new("/dest/etc/passwd"));
    }

    #[test]
    fn join_plain_relative_path() {
        let base = Path::new("/dest");
        assert_eq!(join(base, "foo/bar.txt"), Path::new("/dest/foo/bar.txt"));
    }

    #[test]
    fn strip_tilde_prefix_plain() {
        assert_eq!(
            strip_tilde_prefix(Path::new("~/a/b")),
            Some(PathBuf::from("a/b"))
        );
        assert_eq!(strip_tilde_prefix(Path::new("~")), Some(PathBuf::from("")));
        assert_eq!(strip_tilde_prefix(Path::new("/a/b")), None);
    }
}
