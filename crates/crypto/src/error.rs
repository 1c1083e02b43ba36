//! Errors for the token encryptor.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("ciphertext is malformed or truncated")]
    MalformedCiphertext,

    /// Authentication failure on decrypt — tampered or corrupted ciphertext,
    /// or the wrong key. Fails closed: callers must treat this as an
    /// integrity violation, not a retryable error.
    #[error("decryption failed: ciphertext authentication did not verify")]
    TamperedOrWrongKey,
}

pub type Result<T> = std::result::Result<T, Error>;
