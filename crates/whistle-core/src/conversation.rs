//! Conversation resolution.
//!
//! Splits a [`Mailbox`] into at most one active conversation and any number
//! of inactive ones. All functions here are pure: they read a mailbox
//! snapshot and never modify it.
//!
//! ## Rules
//!
//! - The active counterparty is the sender of the newest incoming message.
//!   On equal timestamps the message that sorts last wins, which is the one
//!   with the greatest sender id.
//! - A mailbox without incoming messages is attributed entirely to the
//!   recipient of the newest outbound message.
//! - Every other sender of an incoming message gets one inactive
//!   conversation. Recipients that were only ever written to, and are not
//!   the active counterparty, appear in no conversation.
//!
//! Only one conversation is ever active, and no counterparty appears in two
//! conversations.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tracing::debug;
use whistle_protocol::RecipientId;

use crate::mailbox::Mailbox;
use crate::message::Message;

/// The conversation currently shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveConversation {
    /// The counterparty.
    pub recipient: RecipientId,
    /// Timestamp of the message that selected this conversation.
    pub last_updated: DateTime<Utc>,
    /// Messages in this conversation.
    pub messages: BTreeSet<Message>,
}

impl ActiveConversation {
    /// Messages oldest first.
    pub fn ordered(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

/// A conversation with a counterparty other than the active one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InactiveConversation {
    /// The counterparty.
    pub recipient: RecipientId,
    /// Messages in this conversation.
    pub messages: BTreeSet<Message>,
}

impl InactiveConversation {
    /// Newest timestamp across the conversation.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.messages.last().map(Message::timestamp)
    }
}

/// Newest incoming message, if any.
fn latest_incoming(mailbox: &Mailbox) -> Option<&Message> {
    mailbox.incoming().next_back()
}

/// All messages exchanged with `recipient`, in either direction.
pub fn messages_for_recipient(recipient: &RecipientId, mailbox: &Mailbox) -> BTreeSet<Message> {
    mailbox
        .iter()
        .filter(|m| m.counterparty() == recipient)
        .cloned()
        .collect()
}

/// Resolve the active conversation.
///
/// Returns `None` for an empty mailbox.
pub fn find_active_conversation(mailbox: &Mailbox) -> Option<ActiveConversation> {
    if let Some(latest) = latest_incoming(mailbox) {
        let recipient = latest.counterparty().clone();
        let messages = messages_for_recipient(&recipient, mailbox);
        return Some(ActiveConversation {
            recipient,
            last_updated: latest.timestamp(),
            messages,
        });
    }

    let latest = mailbox.iter().next_back()?;
    if let Some(recipients) = mailbox.outbound_only_recipients() {
        debug!(
            recipients = recipients.len(),
            "Outbound-only mailbox spans several recipients"
        );
    }
    Some(ActiveConversation {
        recipient: latest.counterparty().clone(),
        last_updated: latest.timestamp(),
        messages: mailbox.iter().cloned().collect(),
    })
}

/// Resolve the inactive conversations.
///
/// Returns `None` when there is no incoming message from anyone other than
/// the active counterparty. Conversations come back in ascending recipient
/// order, though callers should not depend on it.
pub fn find_inactive_conversations(mailbox: &Mailbox) -> Option<Vec<InactiveConversation>> {
    let active = latest_incoming(mailbox)?.counterparty();

    let mut grouped: BTreeMap<&RecipientId, BTreeSet<Message>> = BTreeMap::new();
    for sender in mailbox
        .incoming()
        .map(Message::counterparty)
        .filter(|sender| *sender != active)
    {
        grouped.entry(sender).or_default();
    }
    if grouped.is_empty() {
        return None;
    }

    for message in mailbox.iter() {
        if let Some(messages) = grouped.get_mut(message.counterparty()) {
            messages.insert(message.clone());
        }
    }

    Some(
        grouped
            .into_iter()
            .map(|(recipient, messages)| InactiveConversation {
                recipient: recipient.clone(),
                messages,
            })
            .collect(),
    )
}

/// One consistent view of the mailbox for the inbox screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inbox {
    /// The active conversation.
    pub active: Option<ActiveConversation>,
    /// All other conversations.
    pub inactive: Option<Vec<InactiveConversation>>,
    /// Total messages in the mailbox.
    pub message_count: usize,
}

impl Inbox {
    /// Resolve both conversation kinds from the same mailbox.
    pub fn from_mailbox(mailbox: &Mailbox) -> Self {
        Self {
            active: find_active_conversation(mailbox),
            inactive: find_inactive_conversations(mailbox),
            message_count: mailbox.len(),
        }
    }

    /// Like [`Inbox::from_mailbox`], treating an unavailable mailbox as empty.
    pub fn resolve(mailbox: Option<&Mailbox>) -> Self {
        mailbox.map(Self::from_mailbox).unwrap_or_default()
    }

    /// True if there is nothing to show.
    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }
}
