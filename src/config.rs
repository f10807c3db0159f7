//! Store configuration.
//!
//! `StoreConfig` mirrors the options object the hosting framework passes at
//! construction time. Unknown fields are ignored for forward compatibility,
//! and a bare path is accepted as shorthand for "everything else default".

use crate::crypto::CipherKind;
use crate::error::{Result, StashError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_true() -> bool {
    true
}

fn default_stale_timeout_ms() -> u64 {
    5_000
}

fn default_refresh_interval_ms() -> u64 {
    1_500
}

/// Configuration for a [`Store`](crate::Store).
///
/// The target file path is required; everything else has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the target file. Required; resolved to an absolute path once
    /// at store construction.
    pub file: PathBuf,

    /// Symmetric encryption key (passphrase). When absent, all content
    /// passes through unencrypted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,

    /// Cipher algorithm used when `encryption_key` is set.
    pub cipher: CipherKind,

    /// Whether lock acquisition/release is automatic around every write.
    /// When false, callers drive `lock()`/`unlock()` explicitly.
    pub autolock: bool,

    /// Whether the lock lifecycle also hides the target file at the OS level.
    /// Immutable after construction.
    pub hide_locked_file: bool,

    /// Milliseconds without a refresh touch after which a lock marker is
    /// considered abandoned and reclaimable.
    #[serde(default = "default_stale_timeout_ms")]
    pub stale_timeout_ms: u64,

    /// Minimum milliseconds between refresh touches while a lock is held.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::new(),
            encryption_key: None,
            cipher: CipherKind::default(),
            autolock: default_true(),
            hide_locked_file: default_true(),
            stale_timeout_ms: default_stale_timeout_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration for the given target file with all defaults.
    pub fn new<P: Into<PathBuf>>(file: P) -> Self {
        Self {
            file: file.into(),
            ..Self::default()
        }
    }

    /// Set the encryption key (passphrase).
    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    /// Set the cipher algorithm by name (e.g. `"aes-256-cbc"`).
    pub fn with_cipher(mut self, name: &str) -> Result<Self> {
        self.cipher = name.parse()?;
        Ok(self)
    }

    /// Enable or disable automatic locking around writes.
    pub fn with_autolock(mut self, autolock: bool) -> Self {
        self.autolock = autolock;
        self
    }

    /// Enable or disable hiding the target file while locked.
    pub fn with_hide_locked_file(mut self, hide: bool) -> Self {
        self.hide_locked_file = hide;
        self
    }

    /// Staleness timeout as a [`Duration`].
    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    /// Refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Validate the configuration.
    ///
    /// A missing/empty file path is a fatal configuration error.
    pub fn validate(&self) -> Result<()> {
        if self.file.as_os_str().is_empty() {
            return Err(StashError::Config(
                "a target file path is required".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&str> for StoreConfig {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for StoreConfig {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for StoreConfig {
    fn from(path: &Path) -> Self {
        Self::new(path.to_path_buf())
    }
}
