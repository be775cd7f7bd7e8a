//! # whistle-store
//!
//! Encrypted local storage for the Whistle messaging client.
//!
//! Provides:
//! - [`Vault`]: password-protected record store using sled + XChaCha20-Poly1305
//! - [`PrivateSendingQueue`]: fixed-size outbound queue padded with cover traffic
//!
//! ## Vault
//!
//! The vault key is derived from the passphrase with Argon2id. Opening a
//! vault fails the same way whether it is missing, damaged or the
//! passphrase is wrong.
//!
//! ```no_run
//! use whistle_store::{KdfParams, Vault};
//! use std::path::Path;
//!
//! let vault = Vault::create(Path::new("/tmp/whistle"), b"passphrase", &KdfParams::default()).unwrap();
//! vault.store(&"secret data").unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod sending_queue;
pub mod vault;

#[cfg(test)]
mod proptests;

pub use error::{Result, StoreError};
pub use sending_queue::PrivateSendingQueue;
pub use vault::{KdfParams, Vault};
