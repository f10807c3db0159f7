//! Error types for the lockstash store.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use thiserror::Error;

/// Main error type for store operations.
///
/// Fatal conditions abort the current operation and propagate synchronously.
/// Non-fatal conditions (non-owner unlock, hiding a nonexistent path) are
/// logged as warnings instead and never surface here.
#[derive(Error, Debug)]
pub enum StashError {
    /// Invalid configuration (missing file path, unknown cipher name).
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The target file is locked by a different process owner.
    #[error("Save aborted: {0}")]
    Contention(String),

    /// Lock marker could not be created or released.
    #[error("Lock operation failed: {0}")]
    Lock(String),

    /// Decryption was requested but no encryption key is configured.
    #[error(
        "cannot decrypt '{0}': no encryption key is configured; the file \
         looks encrypted, or it was fetched with decryption enabled by mistake"
    )]
    MissingKey(String),

    /// Cipher or ciphertext-encoding failure.
    #[error("Encryption failure: {0}")]
    Crypto(String),

    /// Underlying filesystem failure (read/write/rename/permissions).
    #[error("{0}")]
    Io(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StashError>;
