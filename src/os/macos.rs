//! macOS capability: the native hidden flag via `chflags`, permission-bit
//! write denial.

use super::OsCapability;
use crate::error::{Result, StashError};
use log::warn;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Hides files with the BSD `hidden` flag. The path never changes.
pub struct NativeFlag;

fn chflags(flag: &str, path: &Path) -> Result<()> {
    let output = Command::new("chflags")
        .arg(flag)
        .arg(path)
        .output()
        .map_err(|e| StashError::Io(format!("failed to run chflags: {}", e)))?;

    if !output.status.success() {
        return Err(StashError::Io(format!(
            "chflags {} '{}' failed: {}",
            flag,
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

impl OsCapability for NativeFlag {
    fn hide(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            warn!("cannot hide '{}': no such file", path.display());
            return Ok(path.to_path_buf());
        }
        chflags("hidden", path)?;
        Ok(path.to_path_buf())
    }

    fn unhide(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            warn!("cannot unhide '{}': no such file", path.display());
            return Ok(path.to_path_buf());
        }
        chflags("nohidden", path)?;
        Ok(path.to_path_buf())
    }

    fn deny_write(&self, path: &Path) -> Result<()> {
        super::set_mode(path, 0o444)
    }

    fn allow_write(&self, path: &Path) -> Result<()> {
        super::set_mode(path, 0o644)
    }
}
