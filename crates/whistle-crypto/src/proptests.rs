//! Property-based tests for cryptographic primitives.
//!
//! These tests use proptest to check that:
//!
//! - Sealed data opens to the original plaintext, and only with the right key
//! - Hints are deterministic and bound to both secret and payload
//! - Key agreement is symmetric
//! - Length checks reject malformed inputs

use proptest::prelude::*;

use crate::symmetric::{KEY_SIZE, NONCE_SIZE};
use crate::{
    open, open_with_aad, seal, seal_with_aad, EphemeralKeyPair, Hint, KeyPair, Nonce,
    PublicKey, QueueSecret, SealedBytes, SymmetricKey, HINT_SIZE,
};

// ==================== Symmetric Encryption Property Tests ====================

proptest! {
    /// Sealing followed by opening returns the original plaintext.
    #[test]
    fn seal_open_roundtrip(plaintext: Vec<u8>) {
        let key = SymmetricKey::generate();
        let sealed = seal(&key, &plaintext).unwrap();
        prop_assert_eq!(plaintext, open(&key, &sealed).unwrap());
    }

    /// Opening with a different key fails.
    #[test]
    fn open_wrong_key_fails(plaintext in prop::collection::vec(any::<u8>(), 1..100)) {
        let sealed = seal(&SymmetricKey::generate(), &plaintext).unwrap();
        prop_assert!(open(&SymmetricKey::generate(), &sealed).is_err());
    }

    /// Sealing the same plaintext twice uses fresh nonces.
    #[test]
    fn same_plaintext_different_nonce(plaintext in prop::collection::vec(any::<u8>(), 1..100)) {
        let key = SymmetricKey::generate();
        let a = seal(&key, &plaintext).unwrap();
        let b = seal(&key, &plaintext).unwrap();
        prop_assert_ne!(a.nonce, b.nonce);
        prop_assert_ne!(a.ciphertext, b.ciphertext);
    }

    /// Byte encoding survives a decode and still opens.
    #[test]
    fn sealed_bytes_encoding(plaintext in prop::collection::vec(any::<u8>(), 0..1000)) {
        let key = SymmetricKey::generate();
        let sealed = seal(&key, &plaintext).unwrap();
        let decoded = SealedBytes::from_bytes(&sealed.to_bytes()).unwrap();
        prop_assert_eq!(plaintext, open(&key, &decoded).unwrap());
    }

    /// A flipped AAD byte is rejected.
    #[test]
    fn wrong_aad_fails(
        plaintext in prop::collection::vec(any::<u8>(), 1..100),
        aad in prop::collection::vec(any::<u8>(), 1..64),
        flip in any::<usize>(),
    ) {
        let key = SymmetricKey::generate();
        let sealed = seal_with_aad(&key, &plaintext, &aad).unwrap();
        let mut other = aad.clone();
        let idx = flip % other.len();
        other[idx] ^= 0xff;
        prop_assert!(open_with_aad(&key, &sealed, &other).is_err());
        prop_assert_eq!(open_with_aad(&key, &sealed, &aad).unwrap(), plaintext);
    }

    /// Keys and nonces of the wrong length are rejected.
    #[test]
    fn invalid_lengths_rejected(bytes in prop::collection::vec(any::<u8>(), 0..100)) {
        prop_assert_eq!(SymmetricKey::from_bytes(&bytes).is_ok(), bytes.len() == KEY_SIZE);
        prop_assert_eq!(Nonce::from_bytes(&bytes).is_ok(), bytes.len() == NONCE_SIZE);
        prop_assert_eq!(Hint::from_bytes(&bytes).is_ok(), bytes.len() == HINT_SIZE);
    }
}

// ==================== Hint Property Tests ====================

proptest! {
    /// Hints are a pure function of secret and payload.
    #[test]
    fn hint_deterministic(payload: Vec<u8>) {
        let secret = QueueSecret::generate();
        let a = Hint::compute(&secret, &payload).unwrap();
        let b = Hint::compute(&secret, &payload).unwrap();
        prop_assert!(a.ct_eq(&b));
        prop_assert!(a.verify(&secret, &payload));
    }

    /// A hint does not verify against a different payload.
    #[test]
    fn hint_bound_to_payload(
        a in prop::collection::vec(any::<u8>(), 0..256),
        b in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(a != b);
        let secret = QueueSecret::generate();
        let hint = Hint::compute(&secret, &a).unwrap();
        prop_assert!(!hint.verify(&secret, &b));
    }

    /// Hints from different secrets never collide in practice.
    #[test]
    fn hint_bound_to_secret(payload: Vec<u8>) {
        let h1 = Hint::compute(&QueueSecret::generate(), &payload).unwrap();
        let h2 = Hint::compute(&QueueSecret::generate(), &payload).unwrap();
        prop_assert_ne!(h1, h2);
    }
}

// ==================== X25519 Key Exchange Property Tests ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Both sides of an ephemeral exchange derive the same key.
    #[test]
    fn ephemeral_exchange_agrees(context in "[a-z ]{1,32}") {
        let recipient = KeyPair::generate();
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key().clone();

        let sender = ephemeral.diffie_hellman(recipient.public_key());
        let receiver = recipient.diffie_hellman(&ephemeral_public);
        prop_assert_eq!(*sender.derive_key(&context), *receiver.derive_key(&context));
    }

    /// Restoring a key pair from its secret yields the same public key.
    #[test]
    fn keypair_restore(bytes in prop::array::uniform32(any::<u8>())) {
        let a = KeyPair::from_secret_bytes(&bytes).unwrap();
        let b = KeyPair::from_secret_bytes(&*a.secret_bytes()).unwrap();
        prop_assert_eq!(a.public_key(), b.public_key());
        let parsed = PublicKey::from_hex(&a.public_key().to_hex()).unwrap();
        prop_assert_eq!(&parsed, a.public_key());
    }
}
