//! # whistle-crypto
//!
//! Cryptographic primitives for the Whistle messaging client.
//!
//! This crate provides:
//! - **XChaCha20-Poly1305** for authenticated symmetric encryption
//! - **X25519** for sealing messages to a recipient's messaging key
//! - **HMAC-SHA256** hints correlating queued messages with local records
//!
//! ## Security
//!
//! All secret data uses `zeroize` for secure memory cleanup.
//! Tag comparisons use constant-time operations via `subtle`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod hint;
pub mod symmetric;
pub mod x25519;

#[cfg(test)]
mod proptests;

pub use error::{CryptoError, Result};
pub use hint::{Hint, QueueSecret, HINT_SIZE, QUEUE_SECRET_SIZE};
pub use symmetric::{open, open_with_aad, seal, seal_with_aad, Nonce, SealedBytes, SymmetricKey};
pub use x25519::{EphemeralKeyPair, KeyPair, PublicKey, SharedSecret, PUBLIC_KEY_SIZE};
