//! Base-128 varint encoding.
//!
//! Every length prefix and small scalar in the TEDAPI wire format is an
//! unsigned varint: 7 value bits per byte, least-significant group first,
//! continuation flag in bit 7 of all bytes except the last.

use bytes::{BufMut, BytesMut};

use crate::error::DecodeError;

/// Maximum number of groups a 32-bit varint may occupy.
const MAX_GROUPS: usize = 5;

/// Returns the number of bytes `value` occupies when varint-encoded.
///
/// Used for the sizing pass of the message builder: container lengths are
/// computed bottom-up before a single byte is emitted.
#[must_use]
pub const fn encoded_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

/// Appends the varint encoding of `value` to `buf`.
pub fn encode(buf: &mut BytesMut, mut value: u32) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Decodes a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
///
/// # Errors
///
/// [`DecodeError::Truncated`] if `buf` ends before a byte with the
/// continuation bit clear; [`DecodeError::Overflow`] if more than 5 groups
/// are present (a guard against unbounded input, values are 32-bit).
pub fn decode(buf: &[u8]) -> Result<(u32, usize), DecodeError> {
    let mut result: u32 = 0;
    for (i, &b) in buf.iter().enumerate() {
        if i >= MAX_GROUPS {
            return Err(DecodeError::Overflow);
        }
        result |= u32::from(b & 0x7F) << (7 * i);
        if b & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }
    Err(DecodeError::Truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_to_vec(value: u32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode(&mut buf, value);
        buf.to_vec()
    }

    #[test]
    fn test_encode_single_byte() {
        assert_eq!(encode_to_vec(0), vec![0x00]);
        assert_eq!(encode_to_vec(1), vec![0x01]);
        assert_eq!(encode_to_vec(127), vec![0x7F]);
    }

    #[test]
    fn test_encode_multi_byte() {
        assert_eq!(encode_to_vec(128), vec![0x80, 0x01]);
        assert_eq!(encode_to_vec(300), vec![0xAC, 0x02]);
        assert_eq!(encode_to_vec(u32::MAX), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_round_trip() {
        let values = [
            0,
            1,
            127,
            128,
            300,
            16_383,
            16_384,
            2_097_151,
            2_097_152,
            268_435_455,
            268_435_456,
            u32::MAX,
        ];
        for v in values {
            let encoded = encode_to_vec(v);
            assert_eq!(encoded.len(), encoded_len(v), "length mismatch for {v}");
            let (decoded, consumed) = decode(&encoded).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(decode(&[]), Err(DecodeError::Truncated));
        assert_eq!(decode(&[0x80]), Err(DecodeError::Truncated));
        assert_eq!(decode(&[0xFF, 0xFF]), Err(DecodeError::Truncated));
    }

    #[test]
    fn test_decode_overflow() {
        // Six continuation groups can never terminate within 32 bits
        assert_eq!(
            decode(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
            Err(DecodeError::Overflow)
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let (value, consumed) = decode(&[0xAC, 0x02, 0xFF, 0xFF]).unwrap();
        assert_eq!(value, 300);
        assert_eq!(consumed, 2);
    }
}
