//! Error types for storage operations.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] whistle_crypto::CryptoError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The vault could not be unlocked.
    ///
    /// Deliberately the same for a missing vault, a wrong passphrase and a
    /// damaged vault.
    #[error("Unable to unlock vault")]
    UnlockFailed,

    /// A vault already exists at the target path.
    #[error("Vault already exists")]
    AlreadyExists,

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    Kdf(String),

    /// Every queue slot holds a real message.
    #[error("Sending queue full: {capacity} messages waiting")]
    QueueFull {
        /// Queue capacity.
        capacity: usize,
    },

    /// Queued payloads must all have the same size.
    #[error("Invalid payload size: expected {expected}, got {actual}")]
    InvalidPayloadSize {
        /// Fixed payload size of the queue.
        expected: usize,
        /// Size of the rejected payload.
        actual: usize,
    },

    /// Queue parameters or persisted queue state are invalid.
    #[error("Invalid queue: {0}")]
    InvalidQueue(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
