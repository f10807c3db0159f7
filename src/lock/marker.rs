//! Lock marker metadata structures and utilities.

use crate::error::{Result, StashError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Metadata stored inside a lock marker file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMarker {
    /// Holder of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the lock holder.
    pub pid: u32,

    /// Timestamp when the lock was acquired (RFC3339).
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last keepalive touch (RFC3339).
    pub touched_at: DateTime<Utc>,
}

impl LockMarker {
    /// Create marker metadata for this process at the current instant.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            owner: owner_string(),
            pid: std::process::id(),
            created_at: now,
            touched_at: now,
        }
    }

    /// Parse marker metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            StashError::Lock(format!(
                "failed to read lock marker '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            StashError::Lock(format!(
                "failed to parse lock marker '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Serialize marker metadata to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StashError::Lock(format!("failed to serialize lock marker: {}", e)))
    }

    /// Time elapsed since the last keepalive touch.
    pub fn age(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.touched_at)
    }

    /// Whether the lock is abandoned: no refresh touch within `timeout`.
    pub fn is_stale(&self, timeout: Duration) -> bool {
        self.age().num_milliseconds() > timeout.as_millis() as i64
    }

    /// Renew the keepalive timestamp.
    pub fn touch(&mut self) {
        self.touched_at = Utc::now();
    }
}

impl Default for LockMarker {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the owner string for marker metadata.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
