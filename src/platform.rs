//! Platform probe (§4.A).
//!
//! Detects the OS and, on Linux, the kernel release, to decide whether the
//! unprivileged overlay-mount namespace trick is available at all.

/// Minimum kernel release that supports the overlay mount namespace trick
/// this launcher relies on.
const MIN_OVERLAY_KERNEL: (u32, u32, u32) = (5, 12, 0);

/// Platform facts consulted when resolving configuration defaults (§3) and
/// validating the `-m` flag (§4.E).
#[derive(Debug, Clone, Copy)]
pub struct Platform {
    /// True when running on Windows.
    pub is_windows: bool,
    /// True iff the kernel is Linux at release `>= 5.12.0`.
    pub supports_overlay_mount: bool,
}

impl Platform {
    /// Probes the current platform.
    pub fn probe() -> Self {
        let is_windows = cfg!(windows);
        let supports_overlay_mount = Self::probe_overlay_support();
        log::debug!(
            "platform probe: is_windows={is_windows} supports_overlay_mount={supports_overlay_mount}"
        );
        Platform {
            is_windows,
            supports_overlay_mount,
        }
    }

    #[cfg(unix)]
    fn probe_overlay_support() -> bool {
        let uname = rustix::system::uname();
        let sysname = uname.sysname().to_string_lossy();
        if sysname != "Linux" {
            return false;
        }
        let release = uname.release().to_string_lossy();
        match parse_kernel_release(&release) {
            Some(version) => version >= MIN_OVERLAY_KERNEL,
            None => false,
        }
    }

    #[cfg(not(unix))]
    fn probe_overlay_support() -> bool {
        false
    }
}

/// Parses a kernel `release` string such as `"5.15.0-91-generic"` into its
/// leading `(major, minor, patch)` triple, tolerating any trailing suffix
/// after the patch component. Returns `None` on parse failure.
fn parse_kernel_release(release: &str) -> Option<(u32, u32, u32)> {
    let mut parts = release.splitn(3, '.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    let patch_field = parts.next()?;
    let patch_digits: String = patch_field.chars().take_while(|c| c.is_ascii_digit()).collect();
    let patch: u32 = patch_digits.parse().ok()?;
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_release() {
        assert_eq!(parse_kernel_release("5.12.0"), Some((5, 12, 0)));
    }

    #[test]
    fn tolerates_trailing_suffix() {
        assert_eq!(parse_kernel_release("5.15.0-91-generic"), Some((5, 15, 0)));
        assert_eq!(parse_kernel_release("6.6.6+"), Some((6, 6, 6)));
    }

    #[test]
    fn rejects_malformed_release() {
        assert_eq!(parse_kernel_release("not-a-version"), None);
        assert_eq!(parse_kernel_release("5"), None);
        assert_eq!(parse_kernel_release("5.12"), None);
    }

    #[test]
    fn compares_lexicographically() {
        assert!((5, 12, 0) >= (5, 12, 0));
        assert!((5, 13, 0) >= (5, 12, 99));
        assert!(!((5, 11, 99) >= (5, 12, 0)));
    }
}
