//! Variable-length unsigned integer encoding used for key derivation
//! parameters.
//!
//! Values below `0xfd` take one byte. Larger values are prefixed by a marker
//! byte (`0xfd`, `0xfe`, `0xff`) followed by a little-endian `u16`, `u32` or
//! `u64`. Only the shortest encoding of a value is accepted.

/// Largest value accepted when decoding.
pub const MAX_COMPACT_SIZE: u64 = 0x0200_0000;

const U16_MARKER: u8 = 0xfd;
const U32_MARKER: u8 = 0xfe;
const U64_MARKER: u8 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum CompactSizeError {
    #[error("compact size encoding ended early: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("non-canonical compact size encoding")]
    NonCanonical,

    #[error("compact size {0} exceeds maximum of {MAX_COMPACT_SIZE}")]
    TooLarge(u64),
}

/// Decode a compact size from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_compact_size(bytes: &[u8]) -> Result<(u64, usize), CompactSizeError> {
    let Some(&marker) = bytes.first() else {
        return Err(CompactSizeError::Truncated {
            needed: 1,
            available: 0,
        });
    };

    let (value, consumed, minimum) = match marker {
        U16_MARKER => (u64::from(u16::from_le_bytes(take::<2>(bytes)?)), 3, 0xfd),
        U32_MARKER => (u64::from(u32::from_le_bytes(take::<4>(bytes)?)), 5, 0x1_0000),
        U64_MARKER => (u64::from_le_bytes(take::<8>(bytes)?), 9, 0x1_0000_0000),
        small => return Ok((u64::from(small), 1)),
    };

    if value < minimum {
        return Err(CompactSizeError::NonCanonical);
    }
    if value > MAX_COMPACT_SIZE {
        return Err(CompactSizeError::TooLarge(value));
    }

    Ok((value, consumed))
}

/// Encode `value` in its shortest form.
pub fn write_compact_size(value: u64) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(9);
    match value {
        0..=0xfc => encoded.push(value as u8),
        0xfd..=0xffff => {
            encoded.push(U16_MARKER);
            encoded.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            encoded.push(U32_MARKER);
            encoded.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            encoded.push(U64_MARKER);
            encoded.extend_from_slice(&value.to_le_bytes());
        }
    }
    encoded
}

fn take<const N: usize>(bytes: &[u8]) -> Result<[u8; N], CompactSizeError> {
    bytes
        .get(1..=N)
        .and_then(|payload| payload.try_into().ok())
        .ok_or(CompactSizeError::Truncated {
            needed: N + 1,
            available: bytes.len(),
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use proptest::prop_assert_eq;
    use test_strategy::proptest;

    use super::*;

    #[test]
    fn single_byte_values() {
        assert_eq!(Ok((0, 1)), read_compact_size(&[0x00]));
        assert_eq!(Ok((0xfc, 1)), read_compact_size(&[0xfc, 0xaa]));
    }

    #[test]
    fn prefixed_values() {
        assert_eq!(Ok((0xfd, 3)), read_compact_size(&[0xfd, 0xfd, 0x00]));
        assert_eq!(Ok((0x1_0000, 5)), read_compact_size(&[0xfe, 0x00, 0x00, 0x01, 0x00]));
    }

    #[test]
    fn empty_input_is_truncated() {
        assert_eq!(
            Err(CompactSizeError::Truncated {
                needed: 1,
                available: 0
            }),
            read_compact_size(&[])
        );
    }

    #[test]
    fn missing_payload_is_truncated() {
        assert_eq!(
            Err(CompactSizeError::Truncated {
                needed: 5,
                available: 3
            }),
            read_compact_size(&[0xfe, 0x01, 0x02])
        );
    }

    #[test]
    fn non_canonical_encodings_are_rejected() {
        assert_eq!(
            Err(CompactSizeError::NonCanonical),
            read_compact_size(&[0xfd, 0x10, 0x00])
        );
        assert_eq!(
            Err(CompactSizeError::NonCanonical),
            read_compact_size(&[0xfe, 0xff, 0xff, 0x00, 0x00])
        );
        assert_eq!(
            Err(CompactSizeError::NonCanonical),
            read_compact_size(&[0xff, 0x01, 0, 0, 0, 0, 0, 0, 0])
        );
    }

    #[test]
    fn oversized_values_are_rejected() {
        let encoded = write_compact_size(MAX_COMPACT_SIZE + 1);
        assert_eq!(
            Err(CompactSizeError::TooLarge(MAX_COMPACT_SIZE + 1)),
            read_compact_size(&encoded)
        );
    }

    #[proptest]
    fn accepted_values_decode_to_themselves(#[strategy(0..=MAX_COMPACT_SIZE)] value: u64) {
        let encoded = write_compact_size(value);
        prop_assert_eq!(Ok((value, encoded.len())), read_compact_size(&encoded));
    }
}
