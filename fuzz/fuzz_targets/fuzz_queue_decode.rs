//! Fuzz target for decoding a persisted sending queue.

#![no_main]

use libfuzzer_sys::fuzz_target;
use whistle_store::PrivateSendingQueue;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut queue) = PrivateSendingQueue::from_bytes(data) {
        // A decoded queue must keep its shape through a dequeue
        let capacity = queue.capacity();
        let payload = queue.dequeue();
        assert_eq!(payload.len(), queue.payload_size());
        assert_eq!(queue.capacity(), capacity);
    }
});
