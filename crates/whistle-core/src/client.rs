//! Main Whistle client implementation.
//!
//! [`WhistleClient`] owns the unlocked session and is the only way to
//! change the mailbox. Conversation queries read a snapshot under the
//! session read lock; sends and dead-drop ingestion take the write lock.
//!
//! # Client Lifecycle
//!
//! ```text
//!     new() ──────────────┐
//!                         │
//!                         ▼
//!                    ┌─────────┐   delete_vault()
//!                    │ Created │◄──────────────────┐
//!                    └────┬────┘                   │
//!                         │                        │
//!          create_vault() / unlock()               │
//!                         │                        │
//!                         ▼                        │
//!                    ┌──────────┐◄────────┐        │
//!                    │ Unlocked │         │        │
//!                    └────┬─────┘   unlock()       │
//!                         │              │         │
//!                    lock()         ┌────┴────┐    │
//!                         │         │ Locked  ├────┘
//!                         └────────►└────┬────┘
//!                                        │
//!                                  shutdown()
//!                                        │
//!                                        ▼
//!                               ┌─────────────────┐
//!                               │ ShuttingDown    │
//!                               └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use whistle_core::{ClientConfig, WhistleClient};
//!
//! let client = WhistleClient::new(ClientConfig::default()).await?;
//! client.create_vault(b"correct horse battery staple").await?;
//!
//! let inbox = client.inbox().await;
//! if let Some(active) = inbox.active {
//!     println!("Talking to {}", active.recipient);
//! }
//!
//! client.lock().await?;
//! ```
//!
//! # Security Notes
//!
//! - Locking persists the session and drops every secret from memory
//! - Unlock failures never reveal whether the vault exists
//! - Send failures are not logged with the step that failed

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, OwnedRwLockWriteGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};
use whistle_crypto::{Hint, PublicKey};
use whistle_protocol::{open_envelope, Envelope, ProtocolError, RecipientId};
use whistle_store::{KdfParams, StoreError, Vault};
use zeroize::Zeroizing;

use crate::config::ClientConfig;
use crate::conversation::{
    find_active_conversation, find_inactive_conversations, ActiveConversation,
    InactiveConversation, Inbox,
};
use crate::error::{CoreError, Result};
use crate::events::MailboxEvent;
use crate::keys::{KeyProvider, StaticKeyProvider};
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::sending::{
    commit_outbound, prepare_outbound, DeliveryStatus, MessageEncryptor, Outbox,
    SealedBoxEncryptor,
};
use crate::session::{join_error, UnlockedSession};

// ============================================================================
// Client State
// ============================================================================

/// The current state of the Whistle client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// No vault has been opened yet, or the vault was deleted.
    Created,

    /// A vault was open and has been locked. Secrets are gone from memory.
    Locked,

    /// A vault is open and the mailbox is available.
    Unlocked,

    /// The client is shutting down and accepts no further operations.
    ShuttingDown,
}

impl ClientState {
    /// Check if the client is ready for operations.
    pub fn is_ready(&self) -> bool {
        matches!(self, ClientState::Unlocked)
    }

    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            ClientState::Created => "Created (no vault open)",
            ClientState::Locked => "Locked",
            ClientState::Unlocked => "Unlocked (ready)",
            ClientState::ShuttingDown => "Shutting down",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Whistle Client
// ============================================================================

/// The Whistle messaging client.
///
/// Thread-safe; share it across tasks behind an `Arc`.
pub struct WhistleClient {
    /// Client configuration.
    config: ClientConfig,

    /// Current client state.
    state: Arc<RwLock<ClientState>>,

    /// Session (Some when unlocked, None otherwise).
    session: Arc<RwLock<Option<UnlockedSession>>>,

    /// Source of verified recipient keys.
    key_provider: Arc<dyn KeyProvider>,

    /// Encrypts outbound messages.
    encryptor: Arc<dyn MessageEncryptor>,

    /// Mailbox change notifications.
    events: broadcast::Sender<MailboxEvent>,
}

impl WhistleClient {
    // ========================================================================
    // Lifecycle Methods
    // ========================================================================

    /// Create a client with no verified keys and the sealed-box encryptor.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` if the configuration is invalid.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        Self::with_collaborators(
            config,
            Arc::new(StaticKeyProvider::unavailable()),
            Arc::new(SealedBoxEncryptor),
        )
        .await
    }

    /// Create a client with explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Config` if the configuration is invalid.
    pub async fn with_collaborators(
        config: ClientConfig,
        key_provider: Arc<dyn KeyProvider>,
        encryptor: Arc<dyn MessageEncryptor>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        debug!("Creating new WhistleClient");

        let (events, _) = broadcast::channel(config.messaging.event_channel_capacity);
        Ok(Self {
            config,
            state: Arc::new(RwLock::new(ClientState::Created)),
            session: Arc::new(RwLock::new(None)),
            key_provider,
            encryptor,
            events,
        })
    }

    /// Get the current client state.
    pub async fn state(&self) -> ClientState {
        *self.state.read().await
    }

    /// Check if the client is unlocked and ready for operations.
    pub async fn is_unlocked(&self) -> bool {
        *self.state.read().await == ClientState::Unlocked
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Subscribe to mailbox change events.
    pub fn subscribe(&self) -> broadcast::Receiver<MailboxEvent> {
        self.events.subscribe()
    }

    /// Whether a vault exists at the configured location.
    pub fn vault_exists(&self) -> bool {
        Vault::exists(&self.config.vault_path())
    }

    // ========================================================================
    // Vault Methods
    // ========================================================================

    /// Create a new vault and unlock it.
    ///
    /// The new session has a fresh key pair, a fresh queue secret, an empty
    /// mailbox and a sending queue full of cover messages.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ShuttingDown` after shutdown, and a storage error
    /// if a vault already exists or cannot be written.
    pub async fn create_vault(&self, passphrase: &[u8]) -> Result<()> {
        let mut state = self.state.write().await;

        match *state {
            ClientState::ShuttingDown => return Err(CoreError::ShuttingDown),
            ClientState::Unlocked => return Err(CoreError::Storage(StoreError::AlreadyExists)),
            ClientState::Created | ClientState::Locked => {}
        }

        info!("Creating vault");

        let path = self.config.vault_path();
        let kdf = KdfParams::from(self.config.kdf);
        let capacity = self.config.queue.capacity;
        let passphrase = Zeroizing::new(passphrase.to_vec());
        let session = tokio::task::spawn_blocking(move || {
            UnlockedSession::create(&path, &passphrase, &kdf, capacity)
        })
        .await
        .map_err(join_error)??;

        *self.session.write().await = Some(session);
        *state = ClientState::Unlocked;
        self.notify(MailboxEvent::Unlocked);
        info!("Vault created and unlocked");

        Ok(())
    }

    /// Unlock the existing vault.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::UnlockFailed` if the vault is missing, damaged or
    /// the passphrase is wrong, without saying which.
    pub async fn unlock(&self, passphrase: &[u8]) -> Result<()> {
        let mut state = self.state.write().await;

        match *state {
            ClientState::Unlocked => {
                debug!("Client already unlocked");
                return Ok(());
            }
            ClientState::ShuttingDown => {
                warn!("Attempted to unlock client that is shutting down");
                return Err(CoreError::ShuttingDown);
            }
            ClientState::Created | ClientState::Locked => {}
        }

        info!("Unlocking WhistleClient");

        let path = self.config.vault_path();
        let passphrase = Zeroizing::new(passphrase.to_vec());
        let session =
            tokio::task::spawn_blocking(move || UnlockedSession::restore(&path, &passphrase))
                .await
                .map_err(|_| CoreError::UnlockFailed)?
                .inspect_err(|_| warn!("Unlock failed"))?;

        *self.session.write().await = Some(session);
        *state = ClientState::Unlocked;
        self.notify(MailboxEvent::Unlocked);
        info!("WhistleClient unlocked successfully");

        Ok(())
    }

    /// Persist and lock the session.
    ///
    /// The in-memory session is always cleared, even if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ShuttingDown` after shutdown.
    pub async fn lock(&self) -> Result<()> {
        let mut state = self.state.write().await;

        match *state {
            ClientState::Locked | ClientState::Created => {
                debug!("Client already locked");
                return Ok(());
            }
            ClientState::ShuttingDown => {
                warn!("Attempted to lock client that is shutting down");
                return Err(CoreError::ShuttingDown);
            }
            ClientState::Unlocked => {}
        }

        info!("Locking WhistleClient");

        self.close_session(true).await;
        *state = ClientState::Locked;
        self.notify(MailboxEvent::Locked);
        info!("WhistleClient locked successfully");

        Ok(())
    }

    /// Delete the vault and everything in it.
    ///
    /// The in-memory session is cleared first, so the mailbox is gone even
    /// if removing the files fails.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ShuttingDown` after shutdown, or a storage error
    /// if the vault directory cannot be removed.
    pub async fn delete_vault(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if *state == ClientState::ShuttingDown {
            return Err(CoreError::ShuttingDown);
        }

        info!("Deleting vault");

        self.close_session(false).await;
        *state = ClientState::Created;
        self.notify(MailboxEvent::Cleared);

        let path = self.config.vault_path();
        tokio::task::spawn_blocking(move || Vault::delete(&path))
            .await
            .map_err(join_error)??;

        info!("Vault deleted");
        Ok(())
    }

    /// Shut the client down. It cannot be used afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        let mut state = self.state.write().await;

        if *state == ClientState::ShuttingDown {
            debug!("Client already shutting down");
            return Ok(());
        }

        info!("Shutting down WhistleClient");

        let was_unlocked = *state == ClientState::Unlocked;
        *state = ClientState::ShuttingDown;
        self.close_session(true).await;
        if was_unlocked {
            self.notify(MailboxEvent::Locked);
        }

        info!("WhistleClient shutdown complete");

        Ok(())
    }

    // ========================================================================
    // Mailbox Queries
    // ========================================================================

    /// A copy of the mailbox.
    ///
    /// # Errors
    ///
    /// Returns `Locked`, `NotInitialized` or `ShuttingDown` when no session
    /// is unlocked.
    pub async fn mailbox(&self) -> Result<Mailbox> {
        let session = self.require_unlocked().await?;
        Ok(session.mailbox().clone())
    }

    /// Active and inactive conversations from one mailbox snapshot.
    ///
    /// An unavailable mailbox yields an empty inbox.
    pub async fn inbox(&self) -> Inbox {
        match self.require_unlocked().await {
            Ok(session) => Inbox::from_mailbox(session.mailbox()),
            Err(_) => Inbox::resolve(None),
        }
    }

    /// The active conversation.
    ///
    /// # Errors
    ///
    /// Fails when no session is unlocked.
    pub async fn active_conversation(&self) -> Result<Option<ActiveConversation>> {
        let session = self.require_unlocked().await?;
        Ok(find_active_conversation(session.mailbox()))
    }

    /// The inactive conversations.
    ///
    /// # Errors
    ///
    /// Fails when no session is unlocked.
    pub async fn inactive_conversations(&self) -> Result<Option<Vec<InactiveConversation>>> {
        let session = self.require_unlocked().await?;
        Ok(find_inactive_conversations(session.mailbox()))
    }

    /// Whether the outbound message with `hint` is still queued.
    ///
    /// # Errors
    ///
    /// Fails when no session is unlocked.
    pub async fn message_status(&self, hint: &Hint) -> Result<DeliveryStatus> {
        let session = self.require_unlocked().await?;
        Ok(DeliveryStatus::of(session.queue(), hint))
    }

    /// The user's public messaging key.
    ///
    /// # Errors
    ///
    /// Fails when no session is unlocked.
    pub async fn user_public_key(&self) -> Result<PublicKey> {
        let session = self.require_unlocked().await?;
        Ok(session.public_key().clone())
    }

    // ========================================================================
    // Mailbox Updates
    // ========================================================================

    /// Encrypt `text` for `recipient`, queue it and record it.
    ///
    /// Encryption runs before the session lock is taken. Queueing, the
    /// mailbox append, the persist and the `Appended` event run on the
    /// blocking pool under the write lock, so dropping the returned future
    /// cannot leave a queued message without its mailbox record or its
    /// change event.
    ///
    /// # Errors
    ///
    /// Validation errors (`EmptyMessage`, `MessageTooLong`,
    /// `InvalidCharacter`, `RecipientUnavailable`) are meant to be shown
    /// inline; `EncryptionFailed` and `QueueUnavailable` carry no detail.
    /// The mailbox is unchanged on any error.
    pub async fn send_message(&self, recipient: &RecipientId, text: &str) -> Result<Message> {
        let sender_key = self.user_public_key().await?;
        let verified_keys = self.key_provider.get_verified_keys().await;
        let now = Utc::now();

        let prepared = prepare_outbound(
            text,
            recipient,
            verified_keys.as_ref(),
            now,
            self.encryptor.as_ref(),
            &sender_key,
        )
        .await?;

        self.with_session_blocking(move |session, events| -> Result<Message> {
            if session.public_key() != prepared.sender_key() {
                return Err(CoreError::Locked);
            }

            let message = commit_outbound(
                prepared,
                Outbox {
                    queue: &mut session.queue,
                    queue_secret: &session.queue_secret,
                    mailbox: &mut session.mailbox,
                },
            )?;
            session.persist_or_warn();
            notify(events, MailboxEvent::Appended { count: 1 });
            Ok(message)
        })
        .await?
    }

    /// Append already decrypted messages. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Fails when no session is unlocked.
    pub async fn receive_messages<I>(&self, messages: I) -> Result<usize>
    where
        I: IntoIterator<Item = Message>,
    {
        let messages: Vec<Message> = messages.into_iter().collect();
        self.with_session_blocking(move |session, events| {
            let added = messages
                .into_iter()
                .map(|message| session.mailbox.insert(message))
                .filter(|inserted| *inserted)
                .count();
            if added > 0 {
                session.persist_or_warn();
                debug!(count = added, "Messages received");
                notify(events, MailboxEvent::Appended { count: added });
            }
            added
        })
        .await
    }

    /// Decrypt dead-drop envelopes and append those addressed to the user.
    ///
    /// Envelopes that are malformed, sealed to another key or carry no
    /// sender are skipped; most dead-drop traffic is not for this user.
    /// Returns how many messages were added.
    ///
    /// # Errors
    ///
    /// Fails when no session is unlocked.
    pub async fn ingest_dead_drop<I, B>(&self, envelopes: I, now: DateTime<Utc>) -> Result<usize>
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let envelopes: Vec<Vec<u8>> = envelopes
            .into_iter()
            .map(|bytes| bytes.as_ref().to_vec())
            .collect();

        self.with_session_blocking(move |session, events| {
            let mut added = 0;
            let mut skipped = 0;
            for bytes in &envelopes {
                let opened = Envelope::from_bytes(bytes)
                    .and_then(|envelope| open_envelope(session.user_keys(), &envelope));
                match opened {
                    Ok(opened) => match opened.sender_id {
                        Some(sender) => {
                            if session
                                .mailbox
                                .insert(Message::incoming(sender, opened.text, now))
                            {
                                added += 1;
                            }
                        }
                        None => skipped += 1,
                    },
                    Err(ProtocolError::DecryptionFailed) => skipped += 1,
                    Err(_) => {
                        debug!("Skipping malformed dead-drop entry");
                        skipped += 1;
                    }
                }
            }
            debug!(added, skipped, "Dead drop processed");
            if added > 0 {
                session.persist_or_warn();
                notify(events, MailboxEvent::Appended { count: added });
            }
            added
        })
        .await
    }

    /// Take the next payload from the sending queue.
    ///
    /// Call this on a fixed schedule and send whatever comes back; real
    /// messages and cover look the same.
    ///
    /// # Errors
    ///
    /// Fails when no session is unlocked, or with a storage error if the
    /// advanced queue cannot be saved. In that case the queue is left as it
    /// was and nothing should be sent this tick.
    pub async fn dequeue_for_sending(&self) -> Result<Vec<u8>> {
        self.with_session_blocking(|session, _| session.take_next_payload())
            .await?
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn notify(&self, event: MailboxEvent) {
        notify(&self.events, event);
    }

    /// Take the session out, optionally persisting it, and drop it.
    async fn close_session(&self, persist: bool) {
        let Some(session) = self.session.write().await.take() else {
            return;
        };
        let closed = tokio::task::spawn_blocking(move || {
            if persist {
                session.persist_or_warn();
            }
            drop(session);
        })
        .await;
        if closed.is_err() {
            warn!("Session close task failed");
        }
    }

    fn state_error(state: ClientState) -> CoreError {
        match state {
            ClientState::Created => CoreError::NotInitialized,
            ClientState::Locked => CoreError::Locked,
            ClientState::ShuttingDown => CoreError::ShuttingDown,
            ClientState::Unlocked => CoreError::NotInitialized,
        }
    }

    /// Read access to the unlocked session.
    ///
    /// The state lock is released before the session lock is taken, so the
    /// session can disappear in between; that case reports `Locked`.
    async fn require_unlocked(&self) -> Result<RwLockReadGuard<'_, UnlockedSession>> {
        let state = *self.state.read().await;
        if state != ClientState::Unlocked {
            return Err(Self::state_error(state));
        }

        RwLockReadGuard::try_map(self.session.read().await, Option::as_ref)
            .map_err(|_| CoreError::Locked)
    }

    /// Run `f` with write access to the unlocked session on the blocking
    /// pool.
    ///
    /// Once the lock is held `f` runs to completion even if the caller's
    /// future is dropped, so anything `f` changes is persisted and announced
    /// from inside it.
    async fn with_session_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UnlockedSession, &broadcast::Sender<MailboxEvent>) -> T + Send + 'static,
        T: Send + 'static,
    {
        let state = *self.state.read().await;
        if state != ClientState::Unlocked {
            return Err(Self::state_error(state));
        }

        let mut session = OwnedRwLockWriteGuard::try_map(
            Arc::clone(&self.session).write_owned().await,
            Option::as_mut,
        )
        .map_err(|_| CoreError::Locked)?;
        let events = self.events.clone();

        tokio::task::spawn_blocking(move || f(&mut *session, &events))
            .await
            .map_err(join_error)
    }
}

fn notify(events: &broadcast::Sender<MailboxEvent>, event: MailboxEvent) {
    // No subscribers is fine.
    let _ = events.send(event);
}

// ============================================================================
// Debug Implementation
// ============================================================================

impl fmt::Debug for WhistleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Don't show sensitive data in debug output
        f.debug_struct("WhistleClient")
            .field("config", &"[ClientConfig]")
            .field("state", &"[RwLock<ClientState>]")
            .field("session", &"[RwLock<Option<UnlockedSession>>]")
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use whistle_crypto::KeyPair;
    use whistle_protocol::{seal_envelope, PaddedCompressedString, RecipientKey, VerifiedPublicKeys};

    const PASSPHRASE: &[u8] = b"test passphrase";

    struct Harness {
        _dir: TempDir,
        client: WhistleClient,
        keys: Arc<StaticKeyProvider>,
        desk: RecipientId,
        desk_keys: KeyPair,
    }

    async fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let desk = RecipientId::new("desk").unwrap();
        let desk_keys = KeyPair::generate();
        let verified: VerifiedPublicKeys = [RecipientKey::new(
            desk.clone(),
            "Desk",
            desk_keys.public_key().clone(),
        )]
        .into_iter()
        .collect();
        let keys = Arc::new(StaticKeyProvider::new(verified));
        let client = WhistleClient::with_collaborators(
            ClientConfig::for_testing(dir.path()),
            keys.clone(),
            Arc::new(SealedBoxEncryptor),
        )
        .await
        .unwrap();
        Harness {
            _dir: dir,
            client,
            keys,
            desk,
            desk_keys,
        }
    }

    // ========================================================================
    // State Tests
    // ========================================================================

    #[test]
    fn test_client_state_is_ready() {
        assert!(!ClientState::Created.is_ready());
        assert!(!ClientState::Locked.is_ready());
        assert!(ClientState::Unlocked.is_ready());
        assert!(!ClientState::ShuttingDown.is_ready());
    }

    #[test]
    fn test_client_state_display() {
        assert_eq!(format!("{}", ClientState::Locked), "Locked");
        assert!(!ClientState::Created.description().is_empty());
    }

    // ========================================================================
    // Lifecycle Tests
    // ========================================================================

    #[tokio::test]
    async fn test_new_client_starts_in_created_state() {
        let h = harness().await;
        assert_eq!(h.client.state().await, ClientState::Created);
        assert!(!h.client.is_unlocked().await);
        assert!(!h.client.vault_exists());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = ClientConfig::builder().with_queue_capacity(0).build();
        assert!(matches!(
            WhistleClient::new(config).await,
            Err(CoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_create_vault_unlocks() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        assert!(h.client.is_unlocked().await);
        assert!(h.client.vault_exists());
        assert!(h.client.mailbox().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_vault_twice_fails() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        h.client.lock().await.unwrap();
        assert!(h.client.create_vault(PASSPHRASE).await.is_err());
        assert_eq!(h.client.state().await, ClientState::Locked);
    }

    #[tokio::test]
    async fn test_unlock_without_vault_fails() {
        let h = harness().await;
        assert!(matches!(
            h.client.unlock(PASSPHRASE).await,
            Err(CoreError::UnlockFailed)
        ));
        assert_eq!(h.client.state().await, ClientState::Created);
    }

    #[tokio::test]
    async fn test_lock_then_unlock() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        let key = h.client.user_public_key().await.unwrap();

        h.client.lock().await.unwrap();
        assert_eq!(h.client.state().await, ClientState::Locked);
        assert!(matches!(h.client.mailbox().await, Err(CoreError::Locked)));

        h.client.unlock(PASSPHRASE).await.unwrap();
        assert_eq!(h.client.user_public_key().await.unwrap(), key);
    }

    #[tokio::test]
    async fn test_wrong_passphrase_keeps_locked() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        h.client.lock().await.unwrap();

        assert!(matches!(
            h.client.unlock(b"wrong").await,
            Err(CoreError::UnlockFailed)
        ));
        assert_eq!(h.client.state().await, ClientState::Locked);
    }

    #[tokio::test]
    async fn test_operations_before_unlock() {
        let h = harness().await;
        assert!(matches!(
            h.client.mailbox().await,
            Err(CoreError::NotInitialized)
        ));
        assert!(matches!(
            h.client.send_message(&h.desk, "hi").await,
            Err(CoreError::NotInitialized)
        ));
        assert!(h.client.inbox().await.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        h.client.shutdown().await.unwrap();

        assert_eq!(h.client.state().await, ClientState::ShuttingDown);
        assert!(matches!(
            h.client.unlock(PASSPHRASE).await,
            Err(CoreError::ShuttingDown)
        ));
        assert!(matches!(h.client.lock().await, Err(CoreError::ShuttingDown)));
        assert!(matches!(
            h.client.mailbox().await,
            Err(CoreError::ShuttingDown)
        ));
        assert!(h.client.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_vault_clears() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        h.client.delete_vault().await.unwrap();

        assert_eq!(h.client.state().await, ClientState::Created);
        assert!(!h.client.vault_exists());
        assert!(matches!(
            h.client.unlock(PASSPHRASE).await,
            Err(CoreError::UnlockFailed)
        ));
    }

    // ========================================================================
    // Messaging Tests
    // ========================================================================

    #[tokio::test]
    async fn test_send_message_pending_then_sent() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();

        let message = h.client.send_message(&h.desk, "tip").await.unwrap();
        let hint = message.hint().unwrap().clone();
        assert_eq!(
            h.client.message_status(&hint).await.unwrap(),
            DeliveryStatus::Pending
        );

        let payload = h.client.dequeue_for_sending().await.unwrap();
        let opened = open_envelope(&h.desk_keys, &Envelope::from_bytes(&payload).unwrap()).unwrap();
        assert_eq!(opened.text, "tip");
        assert_eq!(
            h.client.message_status(&hint).await.unwrap(),
            DeliveryStatus::Sent
        );
    }

    #[tokio::test]
    async fn test_send_without_keys_is_unavailable() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        h.keys.replace(None).await;

        assert!(matches!(
            h.client.send_message(&h.desk, "hi").await,
            Err(CoreError::RecipientUnavailable)
        ));
        assert!(h.client.mailbox().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queue_full_leaves_mailbox_unchanged() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        let capacity = h.client.config().queue.capacity;
        for i in 0..capacity {
            h.client
                .send_message(&h.desk, &format!("message {i}"))
                .await
                .unwrap();
        }

        let result = h.client.send_message(&h.desk, "one too many").await;
        assert!(matches!(result, Err(CoreError::QueueUnavailable)));
        assert_eq!(h.client.mailbox().await.unwrap().len(), capacity);
    }

    #[tokio::test]
    async fn test_ingest_dead_drop() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        let user = h.client.user_public_key().await.unwrap();

        let body = PaddedCompressedString::new("reply from desk").unwrap();
        let for_user = seal_envelope(&user, h.desk_keys.public_key(), Some(&h.desk), &body)
            .unwrap()
            .to_bytes();
        let stranger = KeyPair::generate();
        let for_someone_else =
            seal_envelope(stranger.public_key(), h.desk_keys.public_key(), Some(&h.desk), &body)
                .unwrap()
                .to_bytes();
        let garbage = vec![0u8; 10];

        let added = h
            .client
            .ingest_dead_drop([for_user, for_someone_else, garbage], Utc::now())
            .await
            .unwrap();
        assert_eq!(added, 1);

        let active = h.client.active_conversation().await.unwrap().unwrap();
        assert_eq!(active.recipient, h.desk);
    }

    #[tokio::test]
    async fn test_receive_messages_counts_new_only() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();
        let message = Message::incoming(h.desk.clone(), "hello", Utc::now());

        assert_eq!(
            h.client.receive_messages([message.clone()]).await.unwrap(),
            1
        );
        assert_eq!(h.client.receive_messages([message]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_events() {
        let h = harness().await;
        let mut events = h.client.subscribe();

        h.client.create_vault(PASSPHRASE).await.unwrap();
        h.client
            .receive_messages([Message::incoming(h.desk.clone(), "x", Utc::now())])
            .await
            .unwrap();
        h.client.lock().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), MailboxEvent::Unlocked);
        assert_eq!(
            events.recv().await.unwrap(),
            MailboxEvent::Appended { count: 1 }
        );
        assert_eq!(events.recv().await.unwrap(), MailboxEvent::Locked);
    }

    // ========================================================================
    // Debug Tests
    // ========================================================================

    #[tokio::test]
    async fn test_debug_implementation() {
        let h = harness().await;
        h.client.create_vault(PASSPHRASE).await.unwrap();

        let debug = format!("{:?}", h.client);
        assert!(debug.contains("WhistleClient"));
        assert!(!debug.contains("passphrase"));
    }
}
