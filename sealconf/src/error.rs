//! Error types for envelope decoding and certificate resolution.

use thiserror::Error;

/// Result type for sealconf operations.
pub type SealResult<T> = Result<T, SealError>;

/// Errors that can occur while resolving certificates or processing
/// envelopes.
///
/// A decode pass aborts on the first error; callers never receive a
/// half-substituted string.
#[derive(Debug, Error)]
pub enum SealError {
    #[error("certificate not found: {0}")]
    CertificateNotFound(String),

    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(#[from] base64::DecodeError),

    #[error("certificate '{subject}' has no private key (thumbprint {thumbprint})")]
    NoPrivateKey { subject: String, thumbprint: String },

    #[error("malformed certificate source: {0}")]
    MalformedSource(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("decrypted value is not valid UTF-8: {0}")]
    InvalidPlaintext(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
