//! Mailbox change notifications.

/// Emitted by the client whenever the mailbox or session changes.
///
/// Events carry no message content. Subscribers re-read the mailbox when
/// they want to know what changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailboxEvent {
    /// New messages were added.
    Appended {
        /// Number of messages added.
        count: usize,
    },
    /// The mailbox was wiped together with its vault.
    Cleared,
    /// The session was locked; the mailbox is unavailable.
    Locked,
    /// A session was unlocked; the mailbox is available.
    Unlocked,
}
