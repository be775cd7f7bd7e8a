//! Recipients and their verified messaging keys.
//!
//! A recipient is a journalist or a desk: the non-local party of a
//! conversation. The client may only send to recipients whose messaging
//! key is present in the current [`VerifiedPublicKeys`] and unexpired.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use whistle_crypto::PublicKey;

use crate::error::{ProtocolError, Result};
use crate::limits::{MAX_DISPLAY_NAME_CHARS, MAX_RECIPIENT_ID_LEN};

/// Opaque identifier of a recipient.
///
/// Non-empty, at most [`MAX_RECIPIENT_ID_LEN`] bytes, no control characters.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecipientId(String);

impl RecipientId {
    /// Validate and wrap an identifier.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidRecipientId` if the id is empty, too
    /// long or contains control characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::InvalidRecipientId("empty".into()));
        }
        if id.len() > MAX_RECIPIENT_ID_LEN {
            return Err(ProtocolError::InvalidRecipientId(format!(
                "{} bytes exceeds maximum {}",
                id.len(),
                MAX_RECIPIENT_ID_LEN
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(ProtocolError::InvalidRecipientId(
                "contains control characters".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecipientId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RecipientId> for String {
    fn from(id: RecipientId) -> Self {
        id.0
    }
}

impl std::str::FromStr for RecipientId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientId({})", self.0)
    }
}

/// A recipient's verified messaging key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientKey {
    /// Who this key belongs to.
    pub id: RecipientId,
    /// Human-readable name shown when composing.
    pub display_name: String,
    /// X25519 key that envelopes are sealed to.
    pub messaging_key: PublicKey,
    /// After this instant the key must not be used.
    pub expires_at: Option<DateTime<Utc>>,
}

impl RecipientKey {
    /// Create a recipient key without an expiry.
    pub fn new(id: RecipientId, display_name: impl Into<String>, messaging_key: PublicKey) -> Self {
        let display_name: String = display_name.into();
        let display_name = display_name.chars().take(MAX_DISPLAY_NAME_CHARS).collect();
        Self {
            id,
            display_name,
            messaging_key,
            expires_at: None,
        }
    }

    /// Set an expiry.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True once `now` has reached the expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// The set of messaging keys the client currently trusts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedPublicKeys {
    keys: BTreeMap<RecipientId, RecipientKey>,
}

impl VerifiedPublicKeys {
    /// Create an empty key set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a recipient's key.
    pub fn insert(&mut self, key: RecipientKey) -> Option<RecipientKey> {
        self.keys.insert(key.id.clone(), key)
    }

    /// Look up a usable key for `id` at `now`. Expired keys resolve to `None`.
    pub fn resolve(&self, id: &RecipientId, now: DateTime<Utc>) -> Option<&RecipientKey> {
        self.keys.get(id).filter(|key| !key.is_expired(now))
    }

    /// Find the recipient owning `messaging_key`, if any.
    pub fn find_by_key(&self, messaging_key: &PublicKey) -> Option<&RecipientKey> {
        self.keys
            .values()
            .find(|key| &key.messaging_key == messaging_key)
    }

    /// Recipients with a usable key at `now`, in identifier order.
    pub fn available(&self, now: DateTime<Utc>) -> impl Iterator<Item = &RecipientKey> {
        self.keys.values().filter(move |key| !key.is_expired(now))
    }

    /// Number of keys, expired or not.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no keys are present.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<RecipientKey> for VerifiedPublicKeys {
    fn from_iter<I: IntoIterator<Item = RecipientKey>>(iter: I) -> Self {
        let mut keys = Self::new();
        for key in iter {
            keys.insert(key);
        }
        keys
    }
}
