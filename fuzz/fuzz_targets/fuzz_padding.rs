//! Fuzz target for length-prefixed padding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use whistle_protocol::padding::{pad_to_size, unpad};

const SIZE: usize = 512;

fuzz_target!(|data: &[u8]| {
    // Arbitrary input must unpad or fail, never panic
    if let Ok(inner) = unpad(data) {
        assert!(inner.len() + 4 <= data.len());
    }

    if let Ok(padded) = pad_to_size(data, SIZE) {
        assert_eq!(padded.len(), SIZE);
        assert_eq!(unpad(&padded).unwrap(), data);
    } else {
        assert!(data.len() > SIZE - 4);
    }
});
