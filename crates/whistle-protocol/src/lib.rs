//! # whistle-protocol
//!
//! Message formats for the Whistle messaging client.
//!
//! This crate provides:
//! - **RecipientId / VerifiedPublicKeys**: who a message can be sent to
//! - **PaddedCompressedString**: compressed message body padded to a fixed size
//! - **Envelope**: fixed-size sealed box addressed to one messaging key
//!
//! ## Privacy Design
//!
//! Every envelope on the wire has the same length:
//! - Ephemeral X25519 key per envelope (no correlation between messages)
//! - Message bodies padded to [`limits::MESSAGE_PADDING_LEN`]
//! - Sender identity carried only inside the encrypted payload

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression;
pub mod envelope;
pub mod error;
pub mod limits;
pub mod padding;
pub mod recipient;

#[cfg(test)]
mod proptests;

pub use compression::PaddedCompressedString;
pub use envelope::{open_envelope, seal_envelope, Envelope, OpenedEnvelope, ENVELOPE_SIZE};
pub use error::{ProtocolError, Result};
pub use recipient::{RecipientId, RecipientKey, VerifiedPublicKeys};
