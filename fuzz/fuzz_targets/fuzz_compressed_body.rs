//! Fuzz target for message bodies.
//!
//! Covers both directions: text typed by the user and padded bodies
//! taken out of received envelopes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use whistle_protocol::limits::MESSAGE_PADDING_LEN;
use whistle_protocol::PaddedCompressedString;

fuzz_target!(|data: &[u8]| {
    if let Ok(body) = PaddedCompressedString::from_utf8(data) {
        assert_eq!(body.as_bytes().len(), MESSAGE_PADDING_LEN);
        let text = body.to_text().unwrap();
        assert_eq!(text.as_bytes(), data);
    }

    // Pad to the body size so the length check passes and the prefix and
    // zstd frame get exercised
    let mut padded = data.to_vec();
    padded.resize(MESSAGE_PADDING_LEN, 0);
    if let Ok(body) = PaddedCompressedString::from_padded_bytes(padded) {
        let _ = body.to_text();
    }
});
