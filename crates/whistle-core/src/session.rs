//! Unlocked session state.
//!
//! While the client is unlocked it holds the open vault together with the
//! secrets loaded from it. Everything here is zeroized or dropped when the
//! session ends.
//!
//! The methods are blocking (Argon2id and sled I/O). The client calls every
//! one of them, including each persist after a mailbox or queue change,
//! from the blocking thread pool while it holds the session write lock.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use whistle_crypto::x25519::SECRET_KEY_SIZE;
use whistle_crypto::{KeyPair, PublicKey, QueueSecret};
use whistle_protocol::ENVELOPE_SIZE;
use whistle_store::{KdfParams, PrivateSendingQueue, StoreError, Vault};
use zeroize::Zeroizing;

use crate::error::{CoreError, Result};
use crate::mailbox::Mailbox;

/// Everything persisted in the vault.
#[derive(Deserialize)]
struct SecretData {
    mailbox: Mailbox,
    user_secret: Zeroizing<[u8; SECRET_KEY_SIZE]>,
    queue_secret: QueueSecret,
    queue: PrivateSendingQueue,
}

/// Borrowed form of [`SecretData`] for writing.
#[derive(Serialize)]
struct SecretDataRef<'a> {
    mailbox: &'a Mailbox,
    user_secret: &'a [u8; SECRET_KEY_SIZE],
    queue_secret: &'a QueueSecret,
    queue: &'a PrivateSendingQueue,
}

/// Secrets and mailbox of an unlocked vault.
pub struct UnlockedSession {
    vault: Vault,
    user_keys: KeyPair,
    pub(crate) queue_secret: QueueSecret,
    pub(crate) queue: PrivateSendingQueue,
    pub(crate) mailbox: Mailbox,
}

impl UnlockedSession {
    /// Create a vault at `path` with fresh secrets and an empty mailbox.
    ///
    /// # Errors
    ///
    /// Fails if the vault exists or cannot be written. A vault that was
    /// created but could not be initialized is removed again.
    pub fn create(
        path: &Path,
        passphrase: &[u8],
        kdf: &KdfParams,
        queue_capacity: usize,
    ) -> Result<Self> {
        let queue = PrivateSendingQueue::new(queue_capacity, ENVELOPE_SIZE)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
        }
        let vault = Vault::create(path, passphrase, kdf)?;

        let session = Self {
            vault,
            user_keys: KeyPair::generate(),
            queue_secret: QueueSecret::generate(),
            queue,
            mailbox: Mailbox::new(),
        };
        if let Err(e) = session.persist() {
            drop(session);
            if Vault::delete(path).is_err() {
                warn!("Failed to remove partially created vault");
            }
            return Err(e);
        }

        debug!(capacity = queue_capacity, "Vault created");
        Ok(session)
    }

    /// Open the vault at `path` and load its secrets.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnlockFailed` for a missing vault, a wrong
    /// passphrase or unreadable contents alike.
    pub fn restore(path: &Path, passphrase: &[u8]) -> Result<Self> {
        let vault = Vault::open(path, passphrase)?;
        let data: SecretData = match vault.load() {
            Ok(Some(data)) => data,
            Ok(None) | Err(_) => return Err(CoreError::UnlockFailed),
        };
        let user_keys =
            KeyPair::from_secret_bytes(&data.user_secret[..]).map_err(|_| CoreError::UnlockFailed)?;

        debug!(
            messages = data.mailbox.len(),
            queued = data.queue.real_count(),
            "Vault restored"
        );
        Ok(Self {
            vault,
            user_keys,
            queue_secret: data.queue_secret,
            queue: data.queue,
            mailbox: data.mailbox,
        })
    }

    /// Write the current state to the vault.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub fn persist(&self) -> Result<()> {
        let user_secret = self.user_keys.secret_bytes();
        let data = SecretDataRef {
            mailbox: &self.mailbox,
            user_secret: &*user_secret,
            queue_secret: &self.queue_secret,
            queue: &self.queue,
        };
        self.vault.store(&data).map_err(CoreError::Storage)
    }

    /// Persist, logging instead of failing.
    pub(crate) fn persist_or_warn(&self) {
        if let Err(e) = self.persist() {
            warn!(error = %e, "Failed to persist session");
        }
    }

    /// Dequeue the next payload and save the queue.
    ///
    /// If saving fails the queue is rolled back and the error returned, so a
    /// payload is only handed out once it has been recorded as sent.
    pub(crate) fn take_next_payload(&mut self) -> Result<Vec<u8>> {
        self.take_next_payload_with(Self::persist)
    }

    fn take_next_payload_with<P>(&mut self, persist: P) -> Result<Vec<u8>>
    where
        P: FnOnce(&Self) -> Result<()>,
    {
        let previous = self.queue.clone();
        let payload = self.queue.dequeue();
        if let Err(e) = persist(self) {
            self.queue = previous;
            return Err(e);
        }
        Ok(payload)
    }

    /// The user's key pair.
    pub fn user_keys(&self) -> &KeyPair {
        &self.user_keys
    }

    /// The user's public messaging key.
    pub fn public_key(&self) -> &PublicKey {
        self.user_keys.public_key()
    }

    /// Key used for sending queue hints.
    pub fn queue_secret(&self) -> &QueueSecret {
        &self.queue_secret
    }

    /// The sending queue.
    pub fn queue(&self) -> &PrivateSendingQueue {
        &self.queue
    }

    /// The mailbox.
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

impl fmt::Debug for UnlockedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedSession")
            .field("vault", &self.vault)
            .field("messages", &self.mailbox.len())
            .finish_non_exhaustive()
    }
}

/// Map a failed blocking task to a storage error.
pub(crate) fn join_error(err: tokio::task::JoinError) -> CoreError {
    CoreError::Storage(StoreError::Io(std::io::Error::other(err.to_string())))
}
