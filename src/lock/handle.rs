//! The owned release capability for a held lock.

use crate::error::{Result, StashError};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Release capability for a lock this process created.
///
/// Holding no handle is structurally indistinguishable from "not this
/// process's lock". Releasing consumes the handle and removes the marker
/// file. If a handle is dropped without an explicit release, the marker is
/// removed anyway; a failure there is a warning, not a panic.
#[derive(Debug)]
pub struct LockHandle {
    /// Path to the marker file.
    marker_path: PathBuf,

    /// Whether the marker has been released manually.
    released: bool,
}

impl LockHandle {
    /// Create a handle for a freshly created marker file.
    pub(super) fn new(marker_path: PathBuf) -> Self {
        Self {
            marker_path,
            released: false,
        }
    }

    /// Get the path to the marker file.
    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Release the lock, removing the marker file.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.marker_path).map_err(|e| {
            StashError::Lock(format!(
                "failed to release lock marker '{}': {}",
                self.marker_path.display(),
                e
            ))
        })
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = fs::remove_file(&self.marker_path)
        {
            warn!(
                "failed to remove lock marker '{}' on drop: {}",
                self.marker_path.display(),
                e
            );
        }
    }
}
