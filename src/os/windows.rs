//! Windows capability: hidden attribute via `attrib`, read-only attribute
//! for write denial.

use super::OsCapability;
use crate::error::{Result, StashError};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Hides files with the Windows hidden attribute. The path never changes.
pub struct AttribFlag;

fn attrib(flag: &str, path: &Path) -> Result<()> {
    let output = Command::new("attrib")
        .arg(flag)
        .arg(path)
        .output()
        .map_err(|e| StashError::Io(format!("failed to run attrib: {}", e)))?;

    if !output.status.success() {
        return Err(StashError::Io(format!(
            "attrib {} '{}' failed: {}",
            flag,
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn set_readonly(path: &Path, readonly: bool) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| {
        StashError::Io(format!("failed to stat '{}': {}", path.display(), e))
    })?;
    let mut perms = metadata.permissions();
    perms.set_readonly(readonly);
    fs::set_permissions(path, perms).map_err(|e| {
        StashError::Io(format!(
            "failed to change read-only attribute on '{}': {}",
            path.display(),
            e
        ))
    })
}

impl OsCapability for AttribFlag {
    fn hide(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            warn!("cannot hide '{}': no such file", path.display());
            return Ok(path.to_path_buf());
        }
        attrib("+h", path)?;
        Ok(path.to_path_buf())
    }

    fn unhide(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            warn!("cannot unhide '{}': no such file", path.display());
            return Ok(path.to_path_buf());
        }
        attrib("-h", path)?;
        Ok(path.to_path_buf())
    }

    fn deny_write(&self, path: &Path) -> Result<()> {
        set_readonly(path, true)
    }

    fn allow_write(&self, path: &Path) -> Result<()> {
        set_readonly(path, false)
    }
}
