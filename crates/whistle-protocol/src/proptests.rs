//! Property-based tests for protocol components.
//!
//! These tests check protocol invariants for arbitrary inputs:
//!
//! - Padding always produces the target size and unpads to the input
//! - Compressed bodies are fixed-size and restore their text
//! - Envelopes are fixed-size and open only for their addressee
//! - Arbitrary bytes never panic the decoders

use proptest::prelude::*;
use whistle_crypto::KeyPair;

use crate::compression::PaddedCompressedString;
use crate::envelope::{open_envelope, seal_envelope, Envelope, ENVELOPE_SIZE};
use crate::limits::{MAX_RECIPIENT_ID_LEN, MESSAGE_PADDING_LEN};
use crate::padding::{pad_to_size, unpad, LENGTH_PREFIX_SIZE};
use crate::recipient::RecipientId;

// ==================== Padding Property Tests ====================

proptest! {
    /// Padding hits the target size and unpads to the original data.
    #[test]
    fn pad_unpad_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256), extra in 0usize..256) {
        let size = data.len() + LENGTH_PREFIX_SIZE + extra;
        let padded = pad_to_size(&data, size).unwrap();
        prop_assert_eq!(padded.len(), size);
        prop_assert_eq!(unpad(&padded).unwrap(), data.as_slice());
    }

    /// Unpadding arbitrary bytes returns an error or a slice, never panics.
    #[test]
    fn unpad_arbitrary_never_panics(data: Vec<u8>) {
        if let Ok(inner) = unpad(&data) {
            prop_assert!(inner.len() + LENGTH_PREFIX_SIZE <= data.len());
        }
    }
}

// ==================== Compression Property Tests ====================

proptest! {
    /// Short text always fits and restores exactly.
    #[test]
    fn short_text_roundtrip(text in "[ -~]{0,200}") {
        let body = PaddedCompressedString::new(&text).unwrap();
        prop_assert_eq!(body.as_bytes().len(), MESSAGE_PADDING_LEN);
        prop_assert_eq!(body.to_text().unwrap(), text);
    }

    /// Acceptance agrees with the fill ratio.
    #[test]
    fn fill_ratio_matches_acceptance(text in ".{0,600}") {
        let ratio = PaddedCompressedString::fill_ratio(&text).unwrap();
        prop_assert_eq!(PaddedCompressedString::new(&text).is_ok(), ratio <= 1.0);
    }

    /// Arbitrary padded bodies never panic when decoded.
    #[test]
    fn arbitrary_body_never_panics(bytes in prop::collection::vec(any::<u8>(), MESSAGE_PADDING_LEN)) {
        if let Ok(body) = PaddedCompressedString::from_padded_bytes(bytes) {
            let _ = body.to_text();
        }
    }
}

// ==================== Envelope Property Tests ====================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Envelopes are fixed-size and open to the sealed text.
    #[test]
    fn envelope_roundtrip(
        text in "[ -~\u{e9}\u{4e2d}]{0,120}",
        sender in proptest::option::of("[a-z0-9-]{1,64}"),
    ) {
        let user = KeyPair::generate();
        let peer = KeyPair::generate();
        let sender_id = sender.map(|s| RecipientId::new(s).unwrap());
        let body = PaddedCompressedString::new(&text).unwrap();

        let envelope = seal_envelope(user.public_key(), peer.public_key(), sender_id.as_ref(), &body).unwrap();
        let bytes = envelope.to_bytes();
        prop_assert_eq!(bytes.len(), ENVELOPE_SIZE);

        let opened = open_envelope(&user, &Envelope::from_bytes(&bytes).unwrap()).unwrap();
        prop_assert_eq!(opened.text, text);
        prop_assert_eq!(opened.sender_id, sender_id);
        prop_assert!(open_envelope(&peer, &envelope).is_err());
    }

    /// Recipient ids longer than the limit are rejected.
    #[test]
    fn recipient_id_length_limit(len in 1usize..128) {
        let id = "r".repeat(len);
        prop_assert_eq!(RecipientId::new(id).is_ok(), len <= MAX_RECIPIENT_ID_LEN);
    }
}
