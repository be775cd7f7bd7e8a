//! Compressed, fixed-size message bodies.
//!
//! A message body is the zstd-compressed UTF-8 text behind a 2-byte
//! big-endian length, zero-filled to [`MESSAGE_PADDING_LEN`]. Whether a
//! composed message is too long is decided on the compressed size, so the
//! character limit a user sees depends on how well the text compresses.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::limits::{
    COMPRESSION_LEVEL, MAX_COMPRESSED_LEN, MAX_DECOMPRESSED_LEN, MESSAGE_LENGTH_PREFIX_SIZE,
    MESSAGE_PADDING_LEN,
};

/// A message body ready to go inside an envelope.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct PaddedCompressedString(Vec<u8>);

impl PaddedCompressedString {
    /// Compress and pad `text`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::MessageTooLong` if the compressed text does
    /// not fit, or `ProtocolError::Compression` if zstd fails.
    ///
    /// # Example
    ///
    /// ```
    /// use whistle_protocol::PaddedCompressedString;
    ///
    /// let body = PaddedCompressedString::new("meet at the usual place").unwrap();
    /// assert_eq!(body.as_bytes().len(), 512);
    /// assert_eq!(body.to_text().unwrap(), "meet at the usual place");
    /// ```
    pub fn new(text: &str) -> Result<Self> {
        let compressed = compress(text)?;
        if compressed.len() > MAX_COMPRESSED_LEN {
            return Err(ProtocolError::MessageTooLong {
                max: MAX_COMPRESSED_LEN,
                actual: compressed.len(),
            });
        }

        let mut padded = Vec::with_capacity(MESSAGE_PADDING_LEN);
        padded.extend_from_slice(&(compressed.len() as u16).to_be_bytes());
        padded.extend_from_slice(&compressed);
        padded.resize(MESSAGE_PADDING_LEN, 0);
        Ok(Self(padded))
    }

    /// Validate raw input bytes as UTF-8, then compress and pad.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidCharacter` for bytes that are not UTF-8.
    pub fn from_utf8(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidCharacter)?;
        Self::new(text)
    }

    /// Wrap an already padded body received inside an envelope.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::InvalidEnvelope` if the length or prefix is wrong.
    pub fn from_padded_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != MESSAGE_PADDING_LEN {
            return Err(ProtocolError::InvalidEnvelope(format!(
                "body is {} bytes, expected {}",
                bytes.len(),
                MESSAGE_PADDING_LEN
            )));
        }
        let body = Self(bytes);
        if body.compressed_len() > MAX_COMPRESSED_LEN {
            return Err(ProtocolError::InvalidEnvelope(
                "body length prefix out of range".into(),
            ));
        }
        Ok(body)
    }

    /// Decompress back to text.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Compression` on corrupt data and
    /// `ProtocolError::InvalidCharacter` if the result is not UTF-8.
    pub fn to_text(&self) -> Result<String> {
        let len = self.compressed_len().min(MAX_COMPRESSED_LEN);
        let compressed =
            &self.0[MESSAGE_LENGTH_PREFIX_SIZE..MESSAGE_LENGTH_PREFIX_SIZE + len];
        let bytes = zstd::bulk::decompress(compressed, MAX_DECOMPRESSED_LEN)
            .map_err(|e| ProtocolError::Compression(e.to_string()))?;
        String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidCharacter)
    }

    /// The padded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the padded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// How much of the padding budget `text` would use, as `0.0..`.
    ///
    /// Values above `1.0` mean the text is too long to send.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Compression` if zstd fails.
    pub fn fill_ratio(text: &str) -> Result<f32> {
        let compressed = compress(text)?;
        Ok(compressed.len() as f32 / MAX_COMPRESSED_LEN as f32)
    }

    fn compressed_len(&self) -> usize {
        u16::from_be_bytes([self.0[0], self.0[1]]) as usize
    }
}

impl TryFrom<Vec<u8>> for PaddedCompressedString {
    type Error = ProtocolError;

    fn try_from(bytes: Vec<u8>) -> Result<Self> {
        Self::from_padded_bytes(bytes)
    }
}

impl From<PaddedCompressedString> for Vec<u8> {
    fn from(body: PaddedCompressedString) -> Self {
        body.0
    }
}

impl std::fmt::Debug for PaddedCompressedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PaddedCompressedString({} compressed bytes)",
            self.compressed_len()
        )
    }
}

fn compress(text: &str) -> Result<Vec<u8>> {
    zstd::bulk::compress(text.as_bytes(), COMPRESSION_LEVEL)
        .map_err(|e| ProtocolError::Compression(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use rand::RngCore;

    fn incompressible(len: usize) -> String {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_roundtrip() {
        let body = PaddedCompressedString::new("hello from a source").unwrap();
        assert_eq!(body.as_bytes().len(), MESSAGE_PADDING_LEN);
        assert_eq!(body.to_text().unwrap(), "hello from a source");
    }

    #[test]
    fn test_repetitive_text_compresses() {
        let text = "a".repeat(4000);
        let body = PaddedCompressedString::new(&text).unwrap();
        assert_eq!(body.to_text().unwrap(), text);
    }

    #[test]
    fn test_too_long() {
        let text = incompressible(600);
        match PaddedCompressedString::new(&text) {
            Err(ProtocolError::MessageTooLong { max, actual }) => {
                assert_eq!(max, MAX_COMPRESSED_LEN);
                assert!(actual > max);
            }
            other => panic!("expected MessageTooLong, got {:?}", other),
        }
        assert!(PaddedCompressedString::fill_ratio(&text).unwrap() > 1.0);
    }

    #[test]
    fn test_invalid_utf8() {
        let result = PaddedCompressedString::from_utf8(&[0x66, 0xff, 0xfe]);
        assert!(matches!(result, Err(ProtocolError::InvalidCharacter)));
    }

    #[test]
    fn test_fill_ratio_grows() {
        let short = PaddedCompressedString::fill_ratio("hi").unwrap();
        let longer = PaddedCompressedString::fill_ratio(&incompressible(100)).unwrap();
        assert!(short > 0.0);
        assert!(longer > short);
        assert!(longer < 1.0);
    }

    #[test]
    fn test_from_padded_bytes_rejects_bad_input() {
        assert!(PaddedCompressedString::from_padded_bytes(vec![0u8; 10]).is_err());

        let mut bytes = vec![0u8; MESSAGE_PADDING_LEN];
        bytes[0] = 0xff;
        assert!(PaddedCompressedString::from_padded_bytes(bytes).is_err());
    }

    #[test]
    fn test_corrupt_body_fails_to_decompress() {
        let mut bytes = vec![0u8; MESSAGE_PADDING_LEN];
        bytes[1] = 8;
        bytes[2..10].copy_from_slice(b"notzstd!");
        let body = PaddedCompressedString::from_padded_bytes(bytes).unwrap();
        assert!(matches!(body.to_text(), Err(ProtocolError::Compression(_))));
    }
}
