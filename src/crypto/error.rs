//! Error types for string protection

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed (wrong key, wrong purpose or corrupted data)")]
    DecryptionFailed,

    #[error("Unsupported payload version: {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid payload: {0}")]
    InvalidFormat(String),

    #[error("Invalid key file: {0}")]
    InvalidKey(String),

    #[error("Key derivation failed")]
    KeyDerivation,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
