//! The user's mailbox.
//!
//! An append-only, ordered set of [`Message`]s. Structurally equal messages
//! are stored once. Iteration follows the message order, oldest first.

use std::collections::btree_set;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use whistle_protocol::RecipientId;

use crate::message::Message;

/// Ordered, deduplicated collection of messages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    messages: BTreeSet<Message>,
}

impl Mailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message. Returns `false` if an identical one was already present.
    pub fn insert(&mut self, message: Message) -> bool {
        self.messages.insert(message)
    }

    /// Number of distinct messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if the mailbox holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// All messages, oldest first.
    pub fn iter(&self) -> btree_set::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Incoming messages, oldest first.
    pub fn incoming(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_incoming())
    }

    /// Outbound messages, oldest first.
    pub fn outbound(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.messages.iter().filter(|m| m.is_outbound())
    }

    /// Whether `message` is present.
    pub fn contains(&self, message: &Message) -> bool {
        self.messages.contains(message)
    }

    /// Distinct recipients when the mailbox holds only outbound messages
    /// addressed to more than one of them.
    ///
    /// Conversation resolution attributes such a mailbox to the latest
    /// recipient alone; callers can use this to detect the situation.
    pub fn outbound_only_recipients(&self) -> Option<BTreeSet<&RecipientId>> {
        if self.is_empty() || self.incoming().next().is_some() {
            return None;
        }
        let recipients: BTreeSet<_> = self.iter().map(Message::counterparty).collect();
        (recipients.len() > 1).then_some(recipients)
    }
}

impl Extend<Message> for Mailbox {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}

impl FromIterator<Message> for Mailbox {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Mailbox {
    type Item = &'a Message;
    type IntoIter = btree_set::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use whistle_crypto::Hint;

    fn id(s: &str) -> RecipientId {
        RecipientId::new(s).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_duplicates_stored_once() {
        let mut mailbox = Mailbox::new();
        assert!(mailbox.insert(Message::incoming(id("a"), "hi", at(1))));
        assert!(!mailbox.insert(Message::incoming(id("a"), "hi", at(1))));
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_iterates_in_timestamp_order_not_insertion_order() {
        let mailbox: Mailbox = [
            Message::incoming(id("a"), "third", at(3)),
            Message::incoming(id("a"), "first", at(1)),
            Message::outbound(id("a"), "second", at(2), Hint::random()),
        ]
        .into_iter()
        .collect();

        let texts: Vec<_> = mailbox.iter().map(Message::text).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn test_direction_filters() {
        let mailbox: Mailbox = [
            Message::incoming(id("a"), "in", at(1)),
            Message::outbound(id("a"), "out", at(2), Hint::random()),
        ]
        .into_iter()
        .collect();
        assert_eq!(mailbox.incoming().count(), 1);
        assert_eq!(mailbox.outbound().count(), 1);
    }

    #[test]
    fn test_outbound_only_recipients() {
        let single: Mailbox = [
            Message::outbound(id("a"), "1", at(1), Hint::random()),
            Message::outbound(id("a"), "2", at(2), Hint::random()),
        ]
        .into_iter()
        .collect();
        assert!(single.outbound_only_recipients().is_none());

        let mut multi = single.clone();
        multi.insert(Message::outbound(id("b"), "3", at(3), Hint::random()));
        let recipients = multi.outbound_only_recipients().unwrap();
        assert_eq!(recipients.len(), 2);

        multi.insert(Message::incoming(id("a"), "reply", at(4)));
        assert!(multi.outbound_only_recipients().is_none());

        assert!(Mailbox::new().outbound_only_recipients().is_none());
    }
}
