//! Private sending queue.
//!
//! A fixed-capacity queue of equally sized payloads. On creation every slot
//! holds random cover data; real messages replace cover entries from the
//! front. The client takes exactly one payload per tick with
//! [`PrivateSendingQueue::dequeue`] and sends it whether it is real or not,
//! so an observer sees a constant stream of identical-looking envelopes.
//!
//! ## Privacy Properties
//!
//! - **Constant size**: the queue always holds `capacity` entries
//! - **Constant rate**: one payload leaves per tick regardless of activity
//! - **Unlinkable status**: real entries are found again only through their
//!   [`Hint`], which is an HMAC under a secret kept in the vault

use std::collections::VecDeque;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use whistle_crypto::{Hint, QueueSecret};

use crate::{Result, StoreError};

#[derive(Clone, Serialize, Deserialize)]
struct QueueEntry {
    hint: Hint,
    payload: Vec<u8>,
}

impl QueueEntry {
    fn cover(payload_size: usize) -> Self {
        let mut payload = vec![0u8; payload_size];
        OsRng.fill_bytes(&mut payload);
        Self {
            hint: Hint::random(),
            payload,
        }
    }
}

/// Serialized form, validated on the way back in.
#[derive(Clone, Serialize, Deserialize)]
struct QueueState {
    entries: VecDeque<QueueEntry>,
    real_count: usize,
    capacity: usize,
    payload_size: usize,
}

/// Fixed-capacity queue mixing real messages with cover traffic.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "QueueState", into = "QueueState")]
pub struct PrivateSendingQueue {
    entries: VecDeque<QueueEntry>,
    real_count: usize,
    capacity: usize,
    payload_size: usize,
}

impl PrivateSendingQueue {
    /// Create a queue with `capacity` slots of `payload_size` bytes, all cover.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidQueue` if either size is zero.
    pub fn new(capacity: usize, payload_size: usize) -> Result<Self> {
        if capacity == 0 || payload_size == 0 {
            return Err(StoreError::InvalidQueue(
                "capacity and payload size must be non-zero".into(),
            ));
        }
        let entries = (0..capacity)
            .map(|_| QueueEntry::cover(payload_size))
            .collect();
        Ok(Self {
            entries,
            real_count: 0,
            capacity,
            payload_size,
        })
    }

    /// Queue a real payload and return its hint.
    ///
    /// The hint is `HMAC-SHA256(secret, payload)`, so the caller can later
    /// recompute it from the same inputs.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPayloadSize` if the payload has the wrong
    /// size and `StoreError::QueueFull` if every slot holds a real message.
    pub fn enqueue(&mut self, secret: &QueueSecret, payload: &[u8]) -> Result<Hint> {
        if payload.len() != self.payload_size {
            return Err(StoreError::InvalidPayloadSize {
                expected: self.payload_size,
                actual: payload.len(),
            });
        }
        if self.is_full() {
            return Err(StoreError::QueueFull {
                capacity: self.capacity,
            });
        }

        let hint = Hint::compute(secret, payload)?;
        self.entries[self.real_count] = QueueEntry {
            hint: hint.clone(),
            payload: payload.to_vec(),
        };
        self.real_count += 1;
        Ok(hint)
    }

    /// Take the front payload and refill the back with cover.
    pub fn dequeue(&mut self) -> Vec<u8> {
        let front = self
            .entries
            .pop_front()
            .unwrap_or_else(|| QueueEntry::cover(self.payload_size));
        self.real_count = self.real_count.saturating_sub(1);
        self.entries.push_back(QueueEntry::cover(self.payload_size));
        front.payload
    }

    /// True while a real entry with `hint` is still waiting.
    ///
    /// Every real entry is compared, in constant time, so timing does not
    /// reveal the entry's position.
    pub fn contains(&self, hint: &Hint) -> bool {
        self.entries
            .iter()
            .take(self.real_count)
            .fold(false, |found, entry| found | entry.hint.ct_eq(hint))
    }

    /// Number of real messages waiting.
    pub fn real_count(&self) -> usize {
        self.real_count
    }

    /// Number of slots, which is also the number of entries at all times.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size every payload must have.
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    /// True if no more real messages fit.
    pub fn is_full(&self) -> bool {
        self.real_count >= self.capacity
    }

    /// Encode for persistence.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Decode and validate a persisted queue.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` on malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl TryFrom<QueueState> for PrivateSendingQueue {
    type Error = StoreError;

    fn try_from(state: QueueState) -> Result<Self> {
        if state.capacity == 0 || state.entries.len() != state.capacity {
            return Err(StoreError::InvalidQueue("entry count mismatch".into()));
        }
        if state.real_count > state.capacity {
            return Err(StoreError::InvalidQueue("real count out of range".into()));
        }
        if state
            .entries
            .iter()
            .any(|entry| entry.payload.len() != state.payload_size)
        {
            return Err(StoreError::InvalidQueue("payload size mismatch".into()));
        }
        Ok(Self {
            entries: state.entries,
            real_count: state.real_count,
            capacity: state.capacity,
            payload_size: state.payload_size,
        })
    }
}

impl From<PrivateSendingQueue> for QueueState {
    fn from(queue: PrivateSendingQueue) -> Self {
        Self {
            entries: queue.entries,
            real_count: queue.real_count,
            capacity: queue.capacity,
            payload_size: queue.payload_size,
        }
    }
}

impl std::fmt::Debug for PrivateSendingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateSendingQueue")
            .field("capacity", &self.capacity)
            .field("payload_size", &self.payload_size)
            .finish_non_exhaustive()
    }
}
