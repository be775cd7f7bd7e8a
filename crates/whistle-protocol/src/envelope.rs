//! Sealed message envelopes.
//!
//! An envelope is a sealed box addressed to one X25519 messaging key:
//!
//! ```text
//! [ephemeral public key (32)][nonce (24)][ciphertext (768) + tag (16)]
//! ```
//!
//! The key is derived from the ephemeral/recipient shared secret with
//! BLAKE3, and the ephemeral public key is bound in as associated data.
//! The plaintext is a padded [`InnerPayload`], so every envelope has
//! exactly [`ENVELOPE_SIZE`] bytes regardless of content.
//!
//! ## Security Notes
//!
//! - Each envelope uses a fresh ephemeral key pair
//! - The sender's identity lives only inside the ciphertext
//! - Anyone may seal to a public key, so opened payloads are validated

use serde::{Deserialize, Serialize};
use whistle_crypto::symmetric::{NONCE_SIZE, TAG_SIZE};
use whistle_crypto::{
    open_with_aad, seal_with_aad, EphemeralKeyPair, KeyPair, Nonce, PublicKey, SealedBytes,
    SymmetricKey, PUBLIC_KEY_SIZE,
};

use crate::compression::PaddedCompressedString;
use crate::error::{ProtocolError, Result};
use crate::limits::{ENVELOPE_PAYLOAD_LEN, MESSAGE_ENCRYPTION_CONTEXT};
use crate::padding::{pad_to_size, unpad};
use crate::recipient::RecipientId;

/// Size of the ciphertext including its tag.
pub const ENVELOPE_CIPHERTEXT_SIZE: usize = ENVELOPE_PAYLOAD_LEN + TAG_SIZE;

/// Total size of an encoded envelope in bytes.
pub const ENVELOPE_SIZE: usize = PUBLIC_KEY_SIZE + NONCE_SIZE + ENVELOPE_CIPHERTEXT_SIZE;

/// Plaintext carried inside an envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InnerPayload {
    /// Key the recipient should reply to.
    pub sender_key: PublicKey,
    /// Identifier of the sender, present when a recipient writes to the user.
    pub sender_id: Option<RecipientId>,
    /// Message body.
    pub body: PaddedCompressedString,
}

impl InnerPayload {
    fn to_padded_bytes(&self) -> Result<Vec<u8>> {
        let bytes =
            bincode::serialize(self).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        Ok(pad_to_size(&bytes, ENVELOPE_PAYLOAD_LEN)?)
    }

    fn from_padded_bytes(padded: &[u8]) -> Result<Self> {
        let bytes = unpad(padded)?;
        bincode::deserialize(bytes).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }
}

/// A fixed-size sealed box.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    ephemeral_key: PublicKey,
    nonce: Nonce,
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encode to exactly [`ENVELOPE_SIZE`] bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENVELOPE_SIZE);
        out.extend_from_slice(self.ephemeral_key.as_bytes());
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decode from bytes.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidEnvelope` if the input is not exactly
    /// [`ENVELOPE_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ENVELOPE_SIZE {
            return Err(ProtocolError::InvalidEnvelope(format!(
                "expected {} bytes, got {}",
                ENVELOPE_SIZE,
                bytes.len()
            )));
        }
        let (key, rest) = bytes.split_at(PUBLIC_KEY_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);
        Ok(Self {
            ephemeral_key: PublicKey::from_bytes(key)?,
            nonce: Nonce::from_bytes(nonce)?,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// The ephemeral public key sent in the clear.
    pub fn ephemeral_key(&self) -> &PublicKey {
        &self.ephemeral_key
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("ephemeral_key", &self.ephemeral_key)
            .field("nonce", &self.nonce)
            .finish_non_exhaustive()
    }
}

/// The decrypted contents of an envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenedEnvelope {
    /// Sender identifier, if the sender included one.
    pub sender_id: Option<RecipientId>,
    /// Key the sender can be replied to on.
    pub sender_key: PublicKey,
    /// Message text.
    pub text: String,
}

/// Seal `body` to `recipient_key`.
///
/// `sender` supplies the reply key; `sender_id` is set when a recipient
/// writes to a user and left out in the other direction.
///
/// # Errors
///
/// Returns `ProtocolError::Crypto` if encryption fails or
/// `ProtocolError::Serialization` if the payload cannot be encoded.
pub fn seal_envelope(
    recipient_key: &PublicKey,
    sender: &PublicKey,
    sender_id: Option<&RecipientId>,
    body: &PaddedCompressedString,
) -> Result<Envelope> {
    let payload = InnerPayload {
        sender_key: sender.clone(),
        sender_id: sender_id.cloned(),
        body: body.clone(),
    };
    let padded = payload.to_padded_bytes()?;

    let ephemeral = EphemeralKeyPair::generate();
    let ephemeral_key = ephemeral.public_key().clone();
    let shared = ephemeral.diffie_hellman(recipient_key);
    let key = SymmetricKey::from_bytes(&*shared.derive_key(MESSAGE_ENCRYPTION_CONTEXT))?;

    let sealed = seal_with_aad(&key, &padded, ephemeral_key.as_bytes())?;
    Ok(Envelope {
        ephemeral_key,
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
    })
}

/// Open an envelope addressed to `user`.
///
/// # Errors
///
/// Returns `ProtocolError::DecryptionFailed` for envelopes sealed to any
/// other key (including cover traffic), and a format error if the payload
/// inside is malformed.
pub fn open_envelope(user: &KeyPair, envelope: &Envelope) -> Result<OpenedEnvelope> {
    let shared = user.diffie_hellman(&envelope.ephemeral_key);
    let key = SymmetricKey::from_bytes(&*shared.derive_key(MESSAGE_ENCRYPTION_CONTEXT))?;

    let sealed = SealedBytes {
        nonce: envelope.nonce.clone(),
        ciphertext: envelope.ciphertext.clone(),
    };
    let padded = open_with_aad(&key, &sealed, envelope.ephemeral_key.as_bytes())
        .map_err(|_| ProtocolError::DecryptionFailed)?;

    let payload = InnerPayload::from_padded_bytes(&padded)?;
    Ok(OpenedEnvelope {
        sender_id: payload.sender_id,
        sender_key: payload.sender_key,
        text: payload.body.to_text()?,
    })
}
