//! Outbound send pipeline.
//!
//! Sending is split in two phases:
//!
//! 1. [`prepare_outbound`] validates the text, resolves the recipient's
//!    verified key and encrypts. It may await and touches no shared state.
//! 2. [`commit_outbound`] places the envelope in the sending queue and
//!    appends the [`Message::Outbound`] record. It is synchronous, so the
//!    two mutations cannot be separated by a suspension point.
//!
//! If either phase fails the mailbox is left unchanged. Failures are not
//! logged with any detail about which step failed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use whistle_crypto::{Hint, PublicKey, QueueSecret};
use whistle_protocol::{
    seal_envelope, Envelope, PaddedCompressedString, RecipientId, RecipientKey,
    VerifiedPublicKeys,
};
use whistle_store::PrivateSendingQueue;

use crate::error::{CoreError, Result};
use crate::mailbox::Mailbox;
use crate::message::Message;

/// Encrypts a validated message body for one recipient.
#[async_trait]
pub trait MessageEncryptor: Send + Sync {
    /// Seal `body` to `recipient`, with `sender_key` as the reply key.
    async fn encrypt(
        &self,
        body: &PaddedCompressedString,
        recipient: &RecipientKey,
        sender_key: &PublicKey,
    ) -> whistle_protocol::Result<Envelope>;
}

/// Seals envelopes with X25519 and XChaCha20-Poly1305.
#[derive(Clone, Copy, Debug, Default)]
pub struct SealedBoxEncryptor;

#[async_trait]
impl MessageEncryptor for SealedBoxEncryptor {
    async fn encrypt(
        &self,
        body: &PaddedCompressedString,
        recipient: &RecipientKey,
        sender_key: &PublicKey,
    ) -> whistle_protocol::Result<Envelope> {
        seal_envelope(&recipient.messaging_key, sender_key, None, body)
    }
}

/// Queue the encrypted messages wait in before leaving the device.
pub trait SendingQueue: Send + Sync {
    /// Queue `payload`, returning the hint that identifies it.
    fn enqueue(&mut self, secret: &QueueSecret, payload: &[u8]) -> whistle_store::Result<Hint>;

    /// True while the entry with `hint` has not been sent.
    fn contains(&self, hint: &Hint) -> bool;
}

impl SendingQueue for PrivateSendingQueue {
    fn enqueue(&mut self, secret: &QueueSecret, payload: &[u8]) -> whistle_store::Result<Hint> {
        PrivateSendingQueue::enqueue(self, secret, payload)
    }

    fn contains(&self, hint: &Hint) -> bool {
        PrivateSendingQueue::contains(self, hint)
    }
}

/// Delivery state of an outbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Still waiting in the sending queue.
    Pending,
    /// Has left the sending queue.
    Sent,
}

impl DeliveryStatus {
    /// Status of the entry identified by `hint`.
    pub fn of<Q: SendingQueue + ?Sized>(queue: &Q, hint: &Hint) -> Self {
        if queue.contains(hint) {
            DeliveryStatus::Pending
        } else {
            DeliveryStatus::Sent
        }
    }
}

/// An encrypted message ready to be queued.
#[derive(Clone)]
pub struct PreparedMessage {
    recipient: RecipientId,
    text: String,
    envelope: Envelope,
    sender_key: PublicKey,
    queued_at: DateTime<Utc>,
}

impl PreparedMessage {
    /// Who the message is for.
    pub fn recipient(&self) -> &RecipientId {
        &self.recipient
    }

    /// Reply key the envelope was sealed with.
    pub fn sender_key(&self) -> &PublicKey {
        &self.sender_key
    }

    /// The sealed envelope.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }
}

impl std::fmt::Debug for PreparedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedMessage")
            .field("recipient", &self.recipient)
            .field("queued_at", &self.queued_at)
            .finish_non_exhaustive()
    }
}

/// Where a prepared message is committed to.
pub struct Outbox<'a, Q: ?Sized> {
    /// The sending queue.
    pub queue: &'a mut Q,
    /// Key for queue hints.
    pub queue_secret: &'a QueueSecret,
    /// The mailbox receiving the outbound record.
    pub mailbox: &'a mut Mailbox,
}

/// Validate, resolve and encrypt.
///
/// # Errors
///
/// - `EmptyMessage` for empty text
/// - `MessageTooLong` when the compressed text does not fit
/// - `RecipientUnavailable` when keys are missing or the recipient has no
///   usable key at `now`
/// - `EncryptionFailed` for any encryption problem
pub async fn prepare_outbound(
    text: &str,
    recipient: &RecipientId,
    verified_keys: Option<&VerifiedPublicKeys>,
    now: DateTime<Utc>,
    encryptor: &dyn MessageEncryptor,
    sender_key: &PublicKey,
) -> Result<PreparedMessage> {
    if text.is_empty() {
        return Err(CoreError::EmptyMessage);
    }
    let body = PaddedCompressedString::new(text)?;

    let key = verified_keys
        .and_then(|keys| keys.resolve(recipient, now))
        .ok_or(CoreError::RecipientUnavailable)?;

    let envelope = encryptor
        .encrypt(&body, key, sender_key)
        .await
        .map_err(|_| CoreError::EncryptionFailed)?;

    Ok(PreparedMessage {
        recipient: recipient.clone(),
        text: text.to_owned(),
        envelope,
        sender_key: sender_key.clone(),
        queued_at: now,
    })
}

/// Queue a prepared message and record it in the mailbox.
///
/// # Errors
///
/// Returns `QueueUnavailable` if the queue rejects the envelope, in which
/// case the mailbox is not modified.
pub fn commit_outbound<Q: SendingQueue + ?Sized>(
    prepared: PreparedMessage,
    outbox: Outbox<'_, Q>,
) -> Result<Message> {
    let hint = outbox
        .queue
        .enqueue(outbox.queue_secret, &prepared.envelope.to_bytes())
        .map_err(|_| CoreError::QueueUnavailable)?;

    let was_ambiguous = outbox.mailbox.outbound_only_recipients().is_some();
    let message = Message::outbound(prepared.recipient, prepared.text, prepared.queued_at, hint);
    outbox.mailbox.insert(message.clone());
    debug!("Outbound message queued");

    // Reported once, when the mailbox first becomes ambiguous
    if !was_ambiguous {
        if let Some(recipients) = outbox.mailbox.outbound_only_recipients() {
            warn!(
                recipients = recipients.len(),
                "Outbound messages to several recipients without any reply"
            );
        }
    }
    Ok(message)
}

/// Run both phases back to back.
///
/// # Errors
///
/// See [`prepare_outbound`] and [`commit_outbound`].
pub async fn send<Q: SendingQueue + ?Sized>(
    text: &str,
    recipient: &RecipientId,
    verified_keys: Option<&VerifiedPublicKeys>,
    encryptor: &dyn MessageEncryptor,
    sender_key: &PublicKey,
    outbox: Outbox<'_, Q>,
    now: DateTime<Utc>,
) -> Result<Message> {
    let prepared =
        prepare_outbound(text, recipient, verified_keys, now, encryptor, sender_key).await?;
    commit_outbound(prepared, outbox)
}
