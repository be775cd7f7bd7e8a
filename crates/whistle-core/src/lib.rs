//! # whistle-core
//!
//! Conversation resolution and the private send pipeline for the Whistle
//! secure messaging client.
//!
//! ## Quick Start
//!
//! ```ignore
//! use whistle_core::{ClientConfig, WhistleClient};
//!
//! let client = WhistleClient::new(ClientConfig::default()).await?;
//! client.unlock(b"secure passphrase").await?;
//!
//! let inbox = client.inbox().await;
//! println!("{} messages", inbox.message_count);
//!
//! client.lock().await?;
//! ```
//!
//! ## Conversations
//!
//! The mailbox is split into one active conversation, with the sender of
//! the newest incoming message, and inactive conversations with everyone
//! else who has written. The functions in [`conversation`] are pure and can
//! be used on any [`Mailbox`]:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use whistle_core::{find_active_conversation, Mailbox, Message};
//! use whistle_protocol::RecipientId;
//!
//! let desk = RecipientId::new("news-desk").unwrap();
//! let mailbox: Mailbox = [Message::incoming(
//!     desk.clone(),
//!     "Thanks, can you share more?",
//!     Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
//! )]
//! .into_iter()
//! .collect();
//!
//! let active = find_active_conversation(&mailbox).unwrap();
//! assert_eq!(active.recipient, desk);
//! ```
//!
//! ## Client States
//!
//! - **Created**: no vault open
//! - **Locked**: a vault was open and has been locked
//! - **Unlocked**: ready for operations
//! - **ShuttingDown**: client is shutting down

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod keys;
pub mod mailbox;
pub mod message;
pub mod sending;
pub mod session;

#[cfg(test)]
mod proptests;

// Main client export
pub use client::{ClientState, WhistleClient};

pub use config::{
    ClientConfig, ClientConfigBuilder, ConfigError, KdfConfig, MessagingConfig, QueueConfig,
    StorageConfig,
};
pub use conversation::{
    find_active_conversation, find_inactive_conversations, messages_for_recipient,
    ActiveConversation, InactiveConversation, Inbox,
};
pub use error::{CoreError, InlineFeedback, Result, SendFeedback};
pub use events::MailboxEvent;
pub use keys::{KeyProvider, StaticKeyProvider};
pub use mailbox::Mailbox;
pub use message::Message;
pub use sending::{
    commit_outbound, prepare_outbound, send, DeliveryStatus, MessageEncryptor, Outbox,
    PreparedMessage, SealedBoxEncryptor, SendingQueue,
};
pub use session::UnlockedSession;

// Re-export commonly used types
pub use whistle_crypto::Hint;
pub use whistle_protocol::{limits, RecipientId, RecipientKey, VerifiedPublicKeys};
