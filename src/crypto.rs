//! Symmetric encryption for on-disk content.
//!
//! The store keeps the target file as UTF-8 text, so ciphertext is
//! base64-encoded after encryption and decoded before decryption. Key and IV
//! are derived deterministically from the configured passphrase: the same
//! key/cipher pair always round-trips, and content written under one key is
//! unreadable under another (surfacing as a padding/decode failure, nothing
//! smarter is promised).

use crate::error::{Result, StashError};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Named cipher algorithm for on-disk encryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CipherKind {
    /// AES with a 256-bit key in CBC mode (the default).
    #[default]
    #[serde(rename = "aes-256-cbc")]
    Aes256Cbc,
}

impl CipherKind {
    /// Canonical algorithm name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherKind::Aes256Cbc => "aes-256-cbc",
        }
    }
}

impl std::fmt::Display for CipherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CipherKind {
    type Err = StashError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aes-256-cbc" => Ok(CipherKind::Aes256Cbc),
            other => Err(StashError::Config(format!(
                "unsupported cipher '{}' (supported: aes-256-cbc)",
                other
            ))),
        }
    }
}

/// A keyed symmetric cipher.
///
/// Key material is derived from the passphrase at construction and is
/// immutable for the cipher's lifetime.
#[derive(Clone)]
pub struct Cipher {
    kind: CipherKind,
    key: [u8; 32],
    iv: [u8; 16],
}

impl Cipher {
    /// Derive a cipher from a passphrase.
    ///
    /// Key is SHA-256 of the passphrase; IV is the first 16 bytes of
    /// SHA-256(key || passphrase). Both are fixed for a given passphrase so
    /// encrypt/decrypt stay deterministic across processes.
    pub fn new(kind: CipherKind, passphrase: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();

        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.update(passphrase.as_bytes());
        let digest = hasher.finalize();
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&digest[..16]);

        Self { kind, key, iv }
    }

    /// The algorithm this cipher uses.
    pub fn kind(&self) -> CipherKind {
        self.kind
    }

    /// Encrypt plaintext, returning base64-encoded ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> String {
        match self.kind {
            CipherKind::Aes256Cbc => {
                let ciphertext = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
                BASE64.encode(ciphertext)
            }
        }
    }

    /// Decrypt base64-encoded ciphertext back to plaintext.
    ///
    /// Fails when the content is not valid base64, the padding does not
    /// check out (wrong key or cipher), or the plaintext is not UTF-8.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let raw = BASE64
            .decode(ciphertext.trim_end())
            .map_err(|e| StashError::Crypto(format!("ciphertext is not valid base64: {}", e)))?;

        match self.kind {
            CipherKind::Aes256Cbc => {
                let plaintext = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
                    .decrypt_padded_vec_mut::<Pkcs7>(&raw)
                    .map_err(|_| {
                        StashError::Crypto(
                            "decryption failed: wrong key or cipher for this content".to_string(),
                        )
                    })?;

                String::from_utf8(plaintext).map_err(|e| {
                    StashError::Crypto(format!("decrypted content is not valid UTF-8: {}", e))
                })
            }
        }
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("Cipher").field("kind", &self.kind).finish()
    }
}
