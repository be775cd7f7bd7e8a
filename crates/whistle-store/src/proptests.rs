//! Property-based tests for the sending queue.

use proptest::prelude::*;
use whistle_crypto::{Hint, QueueSecret};

use crate::{PrivateSendingQueue, StoreError};

const PAYLOAD_SIZE: usize = 32;

#[derive(Debug, Clone)]
enum Op {
    Enqueue(u8),
    Dequeue,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![any::<u8>().prop_map(Op::Enqueue), Just(Op::Dequeue)]
}

proptest! {
    /// Whatever happens, the queue keeps its size, real messages leave in
    /// FIFO order and a hint is found exactly while its entry waits.
    #[test]
    fn queue_model(capacity in 1usize..6, ops in prop::collection::vec(op(), 0..40)) {
        let secret = QueueSecret::generate();
        let mut queue = PrivateSendingQueue::new(capacity, PAYLOAD_SIZE).unwrap();
        let mut waiting: std::collections::VecDeque<(Vec<u8>, Hint)> = Default::default();
        let mut sent: Vec<Hint> = Vec::new();

        for op in ops {
            match op {
                Op::Enqueue(byte) => {
                    let payload = vec![byte; PAYLOAD_SIZE];
                    match queue.enqueue(&secret, &payload) {
                        Ok(hint) => waiting.push_back((payload, hint)),
                        Err(StoreError::QueueFull { .. }) => prop_assert_eq!(waiting.len(), capacity),
                        Err(e) => return Err(TestCaseError::fail(e.to_string())),
                    }
                }
                Op::Dequeue => {
                    let out = queue.dequeue();
                    prop_assert_eq!(out.len(), PAYLOAD_SIZE);
                    if let Some((payload, hint)) = waiting.pop_front() {
                        prop_assert_eq!(out, payload);
                        sent.push(hint);
                    }
                }
            }
            prop_assert_eq!(queue.real_count(), waiting.len());
            for (_, hint) in &waiting {
                prop_assert!(queue.contains(hint));
            }
            for hint in &sent {
                // The same payload may have been queued again since.
                let requeued = waiting.iter().any(|(_, h)| h == hint);
                prop_assert_eq!(queue.contains(hint), requeued);
            }
        }
    }

    /// Decoding arbitrary bytes never panics.
    #[test]
    fn from_bytes_never_panics(bytes: Vec<u8>) {
        let _ = PrivateSendingQueue::from_bytes(&bytes);
    }
}
