//! Fuzz target for dead-drop envelope parsing.
//!
//! Everything fetched from the dead drop is attacker controlled; parsing
//! and opening must reject garbage without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use whistle_crypto::KeyPair;
use whistle_protocol::{open_envelope, Envelope, ENVELOPE_SIZE};

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = Envelope::from_bytes(data) else {
        return;
    };
    assert_eq!(data.len(), ENVELOPE_SIZE);
    assert_eq!(envelope.to_bytes(), data);

    let user = KeyPair::generate();
    let _ = open_envelope(&user, &envelope);
});
