//! OS-level file visibility and write-permission control.
//!
//! The lock lifecycle optionally hides the target file and revokes write
//! permission while the lock is held. How that is done differs per OS
//! family, so the branching lives behind the [`OsCapability`] trait:
//!
//! - generic Unix: hiding is emulated by renaming to a dot-prefixed name,
//!   so `hide`/`unhide` return the *effective* path the caller must track
//! - macOS: the native hidden flag via `chflags`
//! - Windows: the hidden attribute via `attrib`, read-only attribute for
//!   write denial
//!
//! Hiding or unhiding a path that does not exist is a warning-level no-op.
//! Write denial is advisory hardening only, not a second locking mechanism.

use crate::error::Result;
use std::path::{Path, PathBuf};

#[cfg(all(unix, not(target_os = "macos")))]
mod unix;
#[cfg(all(unix, not(target_os = "macos")))]
use unix::DotRename as Platform;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos::NativeFlag as Platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows::AttribFlag as Platform;

/// Platform-specific file visibility and permission operations.
pub trait OsCapability {
    /// Hide the file at `path`. Returns the effective path afterwards,
    /// which differs from `path` only on platforms that hide by renaming.
    fn hide(&self, path: &Path) -> Result<PathBuf>;

    /// Undo [`hide`](Self::hide). Returns the effective path afterwards.
    fn unhide(&self, path: &Path) -> Result<PathBuf>;

    /// Revoke write permission from the file for other processes.
    fn deny_write(&self, path: &Path) -> Result<()>;

    /// Restore write permission to the file.
    fn allow_write(&self, path: &Path) -> Result<()>;
}

static PLATFORM: Platform = Platform;

/// The capability implementation for the current platform.
pub fn platform() -> &'static dyn OsCapability {
    &PLATFORM
}

/// Set Unix permission bits, with the path in the error message.
#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use crate::error::StashError;
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        StashError::Io(format!(
            "failed to change permissions on '{}': {}",
            path.display(),
            e
        ))
    })
}
