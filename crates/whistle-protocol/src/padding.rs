//! Fixed-size padding for envelope payloads.
//!
//! Layout: a 4-byte big-endian length, the data, then random fill up to
//! the target size. Every payload padded to the same target is
//! indistinguishable by length.

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Errors that can occur during padding operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaddingError {
    /// Data does not fit the target size.
    #[error("Data too large: {actual} bytes exceeds maximum {max}")]
    DataTooLarge {
        /// Actual data size in bytes.
        actual: usize,
        /// Maximum supported size.
        max: usize,
    },

    /// Data is too short to contain a valid length prefix.
    #[error("Data too short to contain length prefix")]
    DataTooShort,

    /// Length prefix indicates more data than available.
    #[error("Invalid length prefix: claims {claimed} bytes but only {available} available")]
    InvalidLengthPrefix {
        /// Length claimed by prefix.
        claimed: usize,
        /// Bytes actually available.
        available: usize,
    },
}

/// Result type for padding operations.
pub type Result<T> = std::result::Result<T, PaddingError>;

/// Pad `data` to exactly `size` bytes.
///
/// # Errors
///
/// Returns `PaddingError::DataTooLarge` if the data plus prefix exceeds `size`.
pub fn pad_to_size(data: &[u8], size: usize) -> Result<Vec<u8>> {
    let max = size.saturating_sub(LENGTH_PREFIX_SIZE);
    if data.len() > max || data.len() > u32::MAX as usize {
        return Err(PaddingError::DataTooLarge {
            actual: data.len(),
            max,
        });
    }

    let mut padded = Vec::with_capacity(size);
    padded.extend_from_slice(&(data.len() as u32).to_be_bytes());
    padded.extend_from_slice(data);

    let mut fill = vec![0u8; size - padded.len()];
    OsRng.fill_bytes(&mut fill);
    padded.extend_from_slice(&fill);

    debug_assert_eq!(padded.len(), size);
    Ok(padded)
}

/// Remove padding, returning exactly the bytes named by the length prefix.
///
/// # Errors
///
/// Returns `PaddingError::DataTooShort` if there is no room for a prefix and
/// `PaddingError::InvalidLengthPrefix` if the prefix overruns the buffer.
pub fn unpad(padded: &[u8]) -> Result<&[u8]> {
    let (prefix, rest) = padded
        .split_first_chunk::<LENGTH_PREFIX_SIZE>()
        .ok_or(PaddingError::DataTooShort)?;
    let length = u32::from_be_bytes(*prefix) as usize;

    if length > rest.len() {
        return Err(PaddingError::InvalidLengthPrefix {
            claimed: length,
            available: rest.len(),
        });
    }

    Ok(&rest[..length])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_unpad_roundtrip() {
        let padded = pad_to_size(b"inner payload", 128).unwrap();
        assert_eq!(padded.len(), 128);
        assert_eq!(unpad(&padded).unwrap(), b"inner payload");
    }

    #[test]
    fn test_pad_empty_data() {
        let padded = pad_to_size(b"", 64).unwrap();
        assert_eq!(&padded[..4], &[0, 0, 0, 0]);
        assert!(unpad(&padded).unwrap().is_empty());
    }

    #[test]
    fn test_pad_exact_fit() {
        let data = vec![0x42u8; 60];
        let padded = pad_to_size(&data, 64).unwrap();
        assert_eq!(unpad(&padded).unwrap(), data.as_slice());
    }

    #[test]
    fn test_pad_too_large() {
        let data = vec![0x42u8; 61];
        assert_eq!(
            pad_to_size(&data, 64),
            Err(PaddingError::DataTooLarge {
                actual: 61,
                max: 60
            })
        );
    }

    #[test]
    fn test_unpad_too_short() {
        assert_eq!(unpad(&[0u8; 2]), Err(PaddingError::DataTooShort));
    }

    #[test]
    fn test_unpad_invalid_length() {
        let mut data = vec![0u8; 64];
        data[0..4].copy_from_slice(&2000u32.to_be_bytes());
        assert_eq!(
            unpad(&data),
            Err(PaddingError::InvalidLengthPrefix {
                claimed: 2000,
                available: 60
            })
        );
    }

    #[test]
    fn test_fill_is_random() {
        let a = pad_to_size(b"same", 256).unwrap();
        let b = pad_to_size(b"same", 256).unwrap();
        assert_eq!(a[..8], b[..8]);
        assert_ne!(a[8..], b[8..]);
    }
}
