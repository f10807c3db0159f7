//! Generic Unix capability: dot-prefix rename hiding, permission-bit write
//! denial.

use super::OsCapability;
use crate::error::{Result, StashError};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Hides files by renaming them to a dot-prefixed sibling.
pub struct DotRename;

/// Compute the dot-prefixed sibling of `path`.
fn hidden_variant(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') {
        return None; // already hidden
    }
    Some(path.with_file_name(format!(".{}", name)))
}

/// Compute the un-dotted sibling of `path`.
fn visible_variant(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stripped = name.strip_prefix('.')?;
    Some(path.with_file_name(stripped))
}

impl OsCapability for DotRename {
    fn hide(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            warn!("cannot hide '{}': no such file", path.display());
            return Ok(path.to_path_buf());
        }

        let Some(hidden) = hidden_variant(path) else {
            return Ok(path.to_path_buf());
        };

        fs::rename(path, &hidden).map_err(|e| {
            StashError::Io(format!("failed to hide '{}': {}", path.display(), e))
        })?;
        Ok(hidden)
    }

    fn unhide(&self, path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            warn!("cannot unhide '{}': no such file", path.display());
            return Ok(path.to_path_buf());
        }

        let Some(visible) = visible_variant(path) else {
            return Ok(path.to_path_buf());
        };

        fs::rename(path, &visible).map_err(|e| {
            StashError::Io(format!("failed to unhide '{}': {}", path.display(), e))
        })?;
        Ok(visible)
    }

    fn deny_write(&self, path: &Path) -> Result<()> {
        super::set_mode(path, 0o444)
    }

    fn allow_write(&self, path: &Path) -> Result<()> {
        super::set_mode(path, 0o644)
    }
}
