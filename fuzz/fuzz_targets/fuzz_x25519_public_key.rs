//! Fuzz target for X25519 public key parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use whistle_crypto::{KeyPair, PublicKey};

fuzz_target!(|data: &[u8]| {
    // Exactly 32 bytes parse, anything else fails
    let Ok(public_key) = PublicKey::from_bytes(data) else {
        assert_ne!(data.len(), 32);
        return;
    };
    assert_eq!(public_key.as_bytes().as_slice(), data);
    assert_eq!(PublicKey::from_hex(&public_key.to_hex()).unwrap(), public_key);

    // Low-order points still produce a shared secret
    let _shared = KeyPair::generate().diffie_hellman(&public_key);
});
