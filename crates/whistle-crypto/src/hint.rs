//! Sending queue hints.
//!
//! A [`Hint`] is an HMAC-SHA256 tag computed over a queued payload with the
//! per-vault [`QueueSecret`]. It is stored next to the local outbound record
//! so the client can later ask the sending queue whether that payload is
//! still waiting, without keeping any other link between the two.
//!
//! ## Security Notes
//!
//! - The queue secret is zeroized on drop and never printed
//! - Hint verification uses constant-time comparison

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Size of a hint in bytes.
pub const HINT_SIZE: usize = 32;

/// Size of the queue secret in bytes.
pub const QUEUE_SECRET_SIZE: usize = 32;

/// Secret key used to authenticate sending queue entries.
///
/// Generated once per vault and persisted inside it.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
pub struct QueueSecret {
    bytes: [u8; QUEUE_SECRET_SIZE],
}

impl QueueSecret {
    /// Generate a new random queue secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; QUEUE_SECRET_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a queue secret from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != QUEUE_SECRET_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: QUEUE_SECRET_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; QUEUE_SECRET_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self { bytes: arr })
    }

    fn mac(&self) -> Result<HmacSha256> {
        <HmacSha256 as Mac>::new_from_slice(&self.bytes).map_err(|_| CryptoError::Mac)
    }
}

impl std::fmt::Debug for QueueSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "QueueSecret([REDACTED])")
    }
}

/// HMAC-SHA256 tag identifying one sending queue entry.
///
/// Ordering and `==` compare the raw bytes so hints can live inside
/// ordered collections. Use [`Hint::ct_eq`] when comparing a stored hint
/// against a freshly computed one.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hint([u8; HINT_SIZE]);

impl Hint {
    /// Compute the hint for `payload` under `secret`.
    ///
    /// The result is deterministic: the same secret and payload always
    /// produce the same hint.
    pub fn compute(secret: &QueueSecret, payload: &[u8]) -> Result<Self> {
        let mut mac = secret.mac()?;
        mac.update(payload);
        let tag: [u8; HINT_SIZE] = mac.finalize().into_bytes().into();
        Ok(Self(tag))
    }

    /// Check that this hint was computed over `payload` with `secret`.
    pub fn verify(&self, secret: &QueueSecret, payload: &[u8]) -> bool {
        match secret.mac() {
            Ok(mut mac) => {
                mac.update(payload);
                mac.verify_slice(&self.0).is_ok()
            }
            Err(_) => false,
        }
    }

    /// Generate a random hint for cover entries.
    pub fn random() -> Self {
        let mut bytes = [0u8; HINT_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a hint from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != HINT_SIZE {
            return Err(CryptoError::InvalidHintLength {
                expected: HINT_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; HINT_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the hint as a byte slice.
    pub fn as_bytes(&self) -> &[u8; HINT_SIZE] {
        &self.0
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }

    /// Format as hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for Hint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Hint({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}
