//! XChaCha20-Poly1305 authenticated encryption.
//!
//! Used for vault records and for the body of sealed message envelopes.
//!
//! ## Security Notes
//!
//! - Keys are zeroized on drop
//! - Nonces are 192-bit and drawn from OsRng, so random generation is safe
//! - NEVER reuse a nonce with the same key

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Size of symmetric key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of nonce in bytes (192 bits for XChaCha20).
pub const NONCE_SIZE: usize = 24;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A 256-bit symmetric key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Generate a new random symmetric key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new((&self.bytes).into())
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey([REDACTED])")
    }
}

/// A 192-bit nonce.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a nonce from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength {
                expected: NONCE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; NONCE_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the nonce as a byte slice.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nonce({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Ciphertext with its nonce.
///
/// Wire format: `[nonce (24 bytes)][ciphertext + tag]`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedBytes {
    /// The nonce used for encryption.
    pub nonce: Nonce,
    /// The ciphertext with authentication tag appended.
    pub ciphertext: Vec<u8>,
}

impl SealedBytes {
    /// Total encoded size.
    pub fn len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }

    /// Check if the ciphertext is empty.
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    /// Encode as `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decode from `nonce || ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Decryption` if the input cannot hold a nonce and a tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption);
        }
        let nonce = Nonce::from_bytes(&bytes[..NONCE_SIZE])?;
        Ok(Self {
            nonce,
            ciphertext: bytes[NONCE_SIZE..].to_vec(),
        })
    }
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// # Example
///
/// ```
/// use whistle_crypto::symmetric::{open, seal, SymmetricKey};
///
/// let key = SymmetricKey::generate();
/// let sealed = seal(&key, b"vault record").unwrap();
/// assert_eq!(open(&key, &sealed).unwrap(), b"vault record");
/// ```
pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<SealedBytes> {
    seal_with_aad(key, plaintext, &[])
}

/// Decrypt and authenticate `sealed` under `key`.
///
/// # Errors
///
/// Returns `CryptoError::Decryption` on a wrong key or tampered data.
pub fn open(key: &SymmetricKey, sealed: &SealedBytes) -> Result<Vec<u8>> {
    open_with_aad(key, sealed, &[])
}

/// Encrypt with additional authenticated data.
///
/// The AAD is bound to the ciphertext but not encrypted.
pub fn seal_with_aad(key: &SymmetricKey, plaintext: &[u8], aad: &[u8]) -> Result<SealedBytes> {
    let nonce = Nonce::generate();
    let ciphertext = key
        .cipher()
        .encrypt(
            XNonce::from_slice(nonce.as_bytes()),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| CryptoError::Encryption("XChaCha20-Poly1305 encryption failed".into()))?;

    Ok(SealedBytes { nonce, ciphertext })
}

/// Decrypt with additional authenticated data.
///
/// The AAD must match the one used when sealing.
pub fn open_with_aad(key: &SymmetricKey, sealed: &SealedBytes, aad: &[u8]) -> Result<Vec<u8>> {
    key.cipher()
        .decrypt(
            XNonce::from_slice(sealed.nonce.as_bytes()),
            Payload {
                msg: &sealed.ciphertext,
                aad,
            },
        )
        .map_err(|_| CryptoError::Decryption)
}
