//! Protocol limits and constants.
//!
//! All protocol limits are defined here for consistent enforcement.

// === Messages ===

/// Size of a padded message body in bytes.
pub const MESSAGE_PADDING_LEN: usize = 512;

/// Size of the big-endian length prefix in front of the compressed body.
pub const MESSAGE_LENGTH_PREFIX_SIZE: usize = 2;

/// Largest compressed body that fits the padding budget.
pub const MAX_COMPRESSED_LEN: usize = MESSAGE_PADDING_LEN - MESSAGE_LENGTH_PREFIX_SIZE;

/// Upper bound on decompressed text, guarding against compression bombs.
pub const MAX_DECOMPRESSED_LEN: usize = 64 * 1024;

/// zstd compression level for message bodies.
pub const COMPRESSION_LEVEL: i32 = 3;

// === Envelopes ===

/// Size of the padded plaintext payload inside an envelope.
pub const ENVELOPE_PAYLOAD_LEN: usize = 768;

/// Domain separator for envelope key derivation.
pub const MESSAGE_ENCRYPTION_CONTEXT: &str = "whistle 2026 sealed envelope v1";

// === Recipients ===

/// Maximum length of a recipient identifier in bytes.
pub const MAX_RECIPIENT_ID_LEN: usize = 64;

/// Maximum length of a recipient display name in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 128;
