//! Error types for protocol operations.

use thiserror::Error;

use crate::padding::PaddingError;

/// Errors that can occur during protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] whistle_crypto::CryptoError),

    /// Compressed message does not fit the padding budget.
    #[error("Message too long: max {max} compressed bytes, got {actual}")]
    MessageTooLong {
        /// Maximum allowed compressed size.
        max: usize,
        /// Actual compressed size.
        actual: usize,
    },

    /// Message text is not valid UTF-8.
    #[error("Message contains an invalid character")]
    InvalidCharacter,

    /// Compression or decompression failed.
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Padding is malformed.
    #[error("Padding error: {0}")]
    Padding(#[from] PaddingError),

    /// Invalid envelope format.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Envelope could not be opened with the given key.
    #[error("Failed to decrypt envelope")]
    DecryptionFailed,

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid recipient identifier.
    #[error("Invalid recipient id: {0}")]
    InvalidRecipientId(String),
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
