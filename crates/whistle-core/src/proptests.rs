//! Property-based tests for conversation resolution.
//!
//! Mailboxes are drawn from a small set of counterparties and timestamps
//! so that ties and repeated senders are common.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use whistle_crypto::Hint;
use whistle_protocol::RecipientId;

use crate::conversation::{find_active_conversation, find_inactive_conversations, Inbox};
use crate::mailbox::Mailbox;
use crate::message::Message;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn message() -> impl Strategy<Value = Message> {
    (
        prop::sample::select(vec!["a", "b", "c", "d"]),
        prop::sample::select(vec!["hi", "ok", "tip"]),
        0i64..8,
        any::<bool>(),
        any::<[u8; 32]>(),
    )
        .prop_map(|(who, text, secs, incoming, hint)| {
            let who = RecipientId::new(who).unwrap();
            if incoming {
                Message::incoming(who, text, at(secs))
            } else {
                Message::outbound(who, text, at(secs), Hint::from_bytes(&hint).unwrap())
            }
        })
}

fn mailbox() -> impl Strategy<Value = Mailbox> {
    prop::collection::vec(message(), 0..24).prop_map(|messages| messages.into_iter().collect())
}

proptest! {
    /// No counterparty is shown in two places.
    #[test]
    fn counterparties_never_repeat(mailbox in mailbox()) {
        let mut seen = BTreeSet::new();
        if let Some(active) = find_active_conversation(&mailbox) {
            seen.insert(active.recipient);
        }
        for conversation in find_inactive_conversations(&mailbox).unwrap_or_default() {
            prop_assert!(seen.insert(conversation.recipient));
        }
    }

    /// The active counterparty sent the newest incoming message.
    #[test]
    fn active_is_latest_incoming_sender(mailbox in mailbox()) {
        let latest = mailbox.incoming().map(Message::timestamp).max();
        let active = find_active_conversation(&mailbox);

        match (latest, active) {
            (Some(latest), Some(active)) => {
                prop_assert_eq!(active.last_updated, latest);
                let latest_from_active = mailbox.incoming().any(|m| {
                    m.timestamp() == latest && m.counterparty() == &active.recipient
                });
                prop_assert!(latest_from_active);
                prop_assert!(active.messages.iter().all(|m| m.counterparty() == &active.recipient));
            }
            (None, Some(active)) => {
                prop_assert_eq!(active.messages.len(), mailbox.len());
            }
            (None, None) => prop_assert!(mailbox.is_empty()),
            (Some(_), None) => prop_assert!(false, "incoming messages but no active conversation"),
        }
    }

    /// Every sender of an incoming message appears somewhere, with all of
    /// their messages.
    #[test]
    fn every_sender_is_shown(mailbox in mailbox()) {
        let inbox = Inbox::from_mailbox(&mailbox);
        let mut shown = BTreeSet::new();
        if let Some(active) = &inbox.active {
            shown.insert(active.recipient.clone());
        }
        for conversation in inbox.inactive.as_deref().unwrap_or_default() {
            let expected = mailbox
                .iter()
                .filter(|m| m.counterparty() == &conversation.recipient)
                .count();
            prop_assert_eq!(conversation.messages.len(), expected);
            prop_assert!(conversation.messages.iter().any(Message::is_incoming));
            shown.insert(conversation.recipient.clone());
        }
        for message in mailbox.incoming() {
            prop_assert!(shown.contains(message.counterparty()));
        }
    }

    /// Resolution depends only on the mailbox contents.
    #[test]
    fn resolution_is_idempotent_and_order_independent(messages in prop::collection::vec(message(), 0..16)) {
        let forward: Mailbox = messages.iter().cloned().collect();
        let backward: Mailbox = messages.into_iter().rev().collect();

        prop_assert_eq!(Inbox::from_mailbox(&forward), Inbox::from_mailbox(&forward));
        prop_assert_eq!(Inbox::from_mailbox(&forward), Inbox::from_mailbox(&backward));
    }

    /// Persisted mailboxes come back identical.
    #[test]
    fn mailbox_survives_encoding(mailbox in mailbox()) {
        let bytes = bincode::serialize(&mailbox).unwrap();
        let decoded: Mailbox = bincode::deserialize(&bytes).unwrap();
        prop_assert_eq!(decoded, mailbox);
    }
}
