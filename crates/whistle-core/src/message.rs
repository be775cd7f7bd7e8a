//! Mailbox messages.
//!
//! A [`Message`] is either an incoming message from a recipient or an
//! outbound message queued to one. Messages are immutable once created.
//!
//! # Ordering
//!
//! Messages are totally ordered by
//! `(timestamp, direction, counterparty, text, hint)`, where incoming sorts
//! before outbound on equal timestamps. The order is consistent with `==`,
//! so two messages compare equal exactly when they are structurally equal.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whistle_crypto::Hint;
use whistle_protocol::RecipientId;

/// A message in the mailbox.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Message {
    /// Received from a recipient and decrypted.
    Incoming {
        /// Who sent it.
        sender: RecipientId,
        /// Message text.
        text: String,
        /// When it was received.
        received_at: DateTime<Utc>,
    },
    /// Written by the user and placed in the sending queue.
    Outbound {
        /// Who it is for.
        recipient: RecipientId,
        /// Message text.
        text: String,
        /// When it was queued.
        queued_at: DateTime<Utc>,
        /// Identifies the queue entry holding the encrypted message.
        hint: Hint,
    },
}

impl Message {
    /// Build an incoming message.
    pub fn incoming(
        sender: RecipientId,
        text: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Message::Incoming {
            sender,
            text: text.into(),
            received_at,
        }
    }

    /// Build an outbound message.
    pub fn outbound(
        recipient: RecipientId,
        text: impl Into<String>,
        queued_at: DateTime<Utc>,
        hint: Hint,
    ) -> Self {
        Message::Outbound {
            recipient,
            text: text.into(),
            queued_at,
            hint,
        }
    }

    /// The ordering timestamp: `received_at` or `queued_at`.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Message::Incoming { received_at, .. } => *received_at,
            Message::Outbound { queued_at, .. } => *queued_at,
        }
    }

    /// The other party: `sender` or `recipient`.
    pub fn counterparty(&self) -> &RecipientId {
        match self {
            Message::Incoming { sender, .. } => sender,
            Message::Outbound { recipient, .. } => recipient,
        }
    }

    /// Message text.
    pub fn text(&self) -> &str {
        match self {
            Message::Incoming { text, .. } | Message::Outbound { text, .. } => text,
        }
    }

    /// The queue hint of an outbound message.
    pub fn hint(&self) -> Option<&Hint> {
        match self {
            Message::Incoming { .. } => None,
            Message::Outbound { hint, .. } => Some(hint),
        }
    }

    /// True for [`Message::Incoming`].
    pub fn is_incoming(&self) -> bool {
        matches!(self, Message::Incoming { .. })
    }

    /// True for [`Message::Outbound`].
    pub fn is_outbound(&self) -> bool {
        matches!(self, Message::Outbound { .. })
    }

    fn direction_rank(&self) -> u8 {
        match self {
            Message::Incoming { .. } => 0,
            Message::Outbound { .. } => 1,
        }
    }

    fn sort_key(&self) -> (DateTime<Utc>, u8, &RecipientId, &str, Option<&Hint>) {
        (
            self.timestamp(),
            self.direction_rank(),
            self.counterparty(),
            self.text(),
            self.hint(),
        )
    }
}

impl Ord for Message {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Message {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
