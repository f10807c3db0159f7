//! Lock acquisition, release, and ownership tracking for a single target file.

use super::handle::LockHandle;
use super::marker::LockMarker;
use crate::error::{Result, StashError};
use crate::os;
use log::{debug, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Owns the mutual-exclusion state for one target file.
///
/// The marker path is derived once from the original target path and never
/// changes, so competing processes constructed with the canonical path always
/// observe the same marker, even while the target itself is hidden under a
/// renamed dot-prefixed name.
#[derive(Debug)]
pub struct LockManager {
    /// Current effective path of the target file. Updated in place when the
    /// platform hides by renaming.
    target: PathBuf,

    /// Path of the advisory lock marker (`<target>.lock`). Immutable.
    marker_path: PathBuf,

    /// Marker age beyond which the lock is abandoned and reclaimable.
    stale_timeout: Duration,

    /// Minimum interval between keepalive touches while held.
    refresh_interval: Duration,

    /// Whether locking also hides the target file and revokes write access.
    hide_locked_file: bool,

    /// Release capability; present only while this process holds the lock.
    handle: Option<LockHandle>,

    /// Our copy of the marker metadata while we hold the lock.
    marker: Option<LockMarker>,
}

/// Compute the marker path for a target file.
fn marker_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("{}.lock", name))
}

impl LockManager {
    /// Create a lock manager for `target`.
    pub fn new(
        target: PathBuf,
        stale_timeout: Duration,
        refresh_interval: Duration,
        hide_locked_file: bool,
    ) -> Self {
        let marker_path = marker_path_for(&target);
        Self {
            target,
            marker_path,
            stale_timeout,
            refresh_interval,
            hide_locked_file,
            handle: None,
            marker: None,
        }
    }

    /// Current effective path of the target file.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the advisory lock marker.
    pub fn marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Whether an advisory lock currently exists for the target, as observed
    /// by any process. Never errors; a failed or unparseable read counts as
    /// "not locked", and so does a stale marker.
    pub fn locked(&self) -> bool {
        match self.read_marker() {
            Some(marker) => !marker.is_stale(self.stale_timeout),
            None => false,
        }
    }

    /// Whether this instance created the current lock and has not released it.
    pub fn is_lock_owner(&self) -> bool {
        self.handle.is_some()
    }

    /// Metadata of whoever currently holds the lock, if readable.
    pub fn holder(&self) -> Option<LockMarker> {
        self.read_marker()
    }

    /// Acquire the advisory lock.
    ///
    /// Idempotent: if the lock is already held (by anyone), this returns
    /// `Ok(false)` without effect, so no side effect ever runs twice. A stale
    /// marker is reclaimed first. Returns `Ok(true)` when this call took
    /// ownership. Creation failures (missing directory, permissions) are
    /// fatal.
    pub fn lock(&mut self) -> Result<bool> {
        if self.locked() {
            return Ok(false);
        }

        // A marker file that exists here is stale or unparseable; remove it
        // so the exclusive create below can succeed.
        if self.marker_path.exists() {
            debug!(
                "reclaiming abandoned lock marker '{}'",
                self.marker_path.display()
            );
            fs::remove_file(&self.marker_path).map_err(|e| {
                StashError::Lock(format!(
                    "failed to reclaim stale lock marker '{}': {}",
                    self.marker_path.display(),
                    e
                ))
            })?;
        }

        let marker = LockMarker::new();
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.marker_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Lost the race: another process locked between our check and
                // the create. Same outcome as "already locked".
                return Ok(false);
            }
            Err(e) => {
                return Err(StashError::Lock(format!(
                    "failed to create lock marker '{}': {}",
                    self.marker_path.display(),
                    e
                )));
            }
        };

        let json = marker.to_json()?;
        file.write_all(json.as_bytes()).map_err(|e| {
            let _ = fs::remove_file(&self.marker_path);
            StashError::Lock(format!("failed to write lock marker: {}", e))
        })?;
        file.sync_all().map_err(|e| {
            let _ = fs::remove_file(&self.marker_path);
            StashError::Lock(format!("failed to sync lock marker: {}", e))
        })?;

        // From here on the handle cleans the marker up if a side effect fails.
        let handle = LockHandle::new(self.marker_path.clone());

        self.ensure_target_exists()?;

        if self.hide_locked_file {
            let capability = os::platform();
            self.target = capability.hide(&self.target)?;
            if self.target.exists() {
                capability.deny_write(&self.target)?;
            }
        }

        self.handle = Some(handle);
        self.marker = Some(marker);
        Ok(true)
    }

    /// Release the advisory lock.
    ///
    /// No-op if not locked. If the lock is held by a different owner this is
    /// a warning-level no-op that never touches the marker; any release
    /// capability this instance holds is cleared regardless. Returns
    /// `Ok(true)` when this call released the lock.
    pub fn unlock(&mut self) -> Result<bool> {
        let Some(handle) = self.handle.take() else {
            self.marker = None;
            if self.locked() {
                let owner = self
                    .read_marker()
                    .map(|m| m.owner)
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(
                    "not releasing lock on '{}': held by {}, not this process",
                    self.target.display(),
                    owner
                );
            }
            return Ok(false);
        };

        if self.hide_locked_file {
            let capability = os::platform();
            if self.target.exists() {
                capability.allow_write(&self.target)?;
            }
            self.target = capability.unhide(&self.target)?;
        }

        handle.release()?;
        self.marker = None;
        Ok(true)
    }

    /// Temporarily restore write permission so the owner itself can write.
    ///
    /// No-op unless this instance holds the lock and write denial is in
    /// force (it is paired with hiding).
    pub fn allow_owner_write(&self) -> Result<()> {
        if self.is_lock_owner() && self.hide_locked_file && self.target.exists() {
            os::platform().allow_write(&self.target)?;
        }
        Ok(())
    }

    /// Re-apply write denial after the owner's own write.
    pub fn deny_other_writes(&self) -> Result<()> {
        if self.is_lock_owner() && self.hide_locked_file && self.target.exists() {
            os::platform().deny_write(&self.target)?;
        }
        Ok(())
    }

    /// Renew the marker's keepalive timestamp while holding the lock.
    ///
    /// Throttled to at most one rewrite per refresh interval. There is no
    /// internal timer: callers that hold a manual lock across long pauses
    /// must call this themselves; the store calls it around every write.
    /// Best-effort — a failed touch logs a warning and the staleness timeout
    /// remains the safety net.
    pub fn refresh(&mut self) {
        let Some(marker) = self.marker.as_mut() else {
            return;
        };

        let elapsed = marker.age().num_milliseconds();
        if elapsed < self.refresh_interval.as_millis() as i64 {
            return;
        }

        marker.touch();
        match marker.to_json() {
            Ok(json) => {
                if let Err(e) = fs::write(&self.marker_path, json) {
                    warn!(
                        "failed to refresh lock marker '{}': {}",
                        self.marker_path.display(),
                        e
                    );
                }
            }
            Err(e) => warn!("failed to serialize lock marker refresh: {}", e),
        }
    }

    /// Read the marker file, treating any failure as absence.
    fn read_marker(&self) -> Option<LockMarker> {
        if !self.marker_path.exists() {
            return None;
        }
        LockMarker::from_file(&self.marker_path).ok()
    }

    /// Create the target file (empty) if it does not exist yet, so hide and
    /// permission side effects always have a file to act on.
    fn ensure_target_exists(&self) -> Result<()> {
        if self.target.exists() {
            return Ok(());
        }
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.target)
            .map_err(|e| {
                StashError::Io(format!(
                    "failed to create target file '{}': {}",
                    self.target.display(),
                    e
                ))
            })?;
        Ok(())
    }
}
