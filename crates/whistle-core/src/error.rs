//! Error types for high-level API operations.
//!
//! Send failures are split in two: validation problems the user can fix
//! are reported inline next to the compose field, everything else shows a
//! single generic message. See [`CoreError::feedback`].

use thiserror::Error;
use whistle_protocol::ProtocolError;
use whistle_store::StoreError;

/// Errors that can occur during high-level API operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No usable verified key for the recipient.
    #[error("Recipient unavailable")]
    RecipientUnavailable,

    /// Compressed message exceeds the padding budget.
    #[error("Message too long: max {max} compressed bytes, got {actual}")]
    MessageTooLong {
        /// Maximum allowed compressed size.
        max: usize,
        /// Actual compressed size.
        actual: usize,
    },

    /// Message is not valid text.
    #[error("Message contains an invalid character")]
    InvalidCharacter,

    /// Message could not be compressed.
    #[error("Message could not be compressed")]
    CompressionFailed,

    /// Message could not be encrypted.
    #[error("Message could not be encrypted")]
    EncryptionFailed,

    /// Message could not be placed in the sending queue.
    #[error("Sending queue unavailable")]
    QueueUnavailable,

    /// Vault missing, damaged or wrong passphrase.
    #[error("Unable to unlock")]
    UnlockFailed,

    /// Message is empty.
    #[error("Message is empty")]
    EmptyMessage,

    /// No vault has been created or unlocked yet.
    #[error("Client not initialized")]
    NotInitialized,

    /// The client is locked.
    #[error("Client is locked")]
    Locked,

    /// The client is shutting down.
    #[error("Client is shutting down")]
    ShuttingDown,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

/// Validation problems shown next to the compose field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineFeedback {
    /// Nothing to send.
    EmptyMessage,
    /// Too long after compression.
    MessageTooLong,
    /// Not valid text.
    InvalidCharacter,
    /// Recipient cannot be messaged right now.
    RecipientUnavailable,
}

/// How a failed send is presented to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendFeedback {
    /// Show this validation problem inline.
    Inline(InlineFeedback),
    /// Show a generic failure with no detail.
    Generic,
}

impl CoreError {
    /// Classify this error for display after a failed send.
    pub fn feedback(&self) -> SendFeedback {
        match self {
            CoreError::EmptyMessage => SendFeedback::Inline(InlineFeedback::EmptyMessage),
            CoreError::MessageTooLong { .. } => {
                SendFeedback::Inline(InlineFeedback::MessageTooLong)
            }
            CoreError::InvalidCharacter => SendFeedback::Inline(InlineFeedback::InvalidCharacter),
            CoreError::RecipientUnavailable => {
                SendFeedback::Inline(InlineFeedback::RecipientUnavailable)
            }
            _ => SendFeedback::Generic,
        }
    }
}

impl From<ProtocolError> for CoreError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::MessageTooLong { max, actual } => {
                CoreError::MessageTooLong { max, actual }
            }
            ProtocolError::InvalidCharacter => CoreError::InvalidCharacter,
            ProtocolError::Compression(_) => CoreError::CompressionFailed,
            _ => CoreError::EncryptionFailed,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnlockFailed => CoreError::UnlockFailed,
            StoreError::QueueFull { .. } | StoreError::InvalidPayloadSize { .. } => {
                CoreError::QueueUnavailable
            }
            other => CoreError::Storage(other),
        }
    }
}

/// Result type for high-level API operations.
pub type Result<T> = std::result::Result<T, CoreError>;
