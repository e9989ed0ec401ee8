//! Variable-length integer encoding for the byte-oriented wire format.
//!
//! The scheme is a big-endian unary-tag-plus-payload encoding optimized for small values: the
//! count of leading 1-bits in the first byte (MSB-first) gives the number of *extra* payload
//! bytes that follow, and the remaining low bits of the first byte hold the high bits of the
//! value.
//!
//! ```text
//! tag (k ones, 1 zero) | payload (7-k bits)   -- k in 0..=7, 1 + k bytes total
//! 0xFF                 | (no payload)         -- k == 8, 9 bytes total, full u64
//! ```
//!
//! `0` takes 1 byte, `u64::MAX` takes 9 bytes; this is the maximum for any 64-bit value.

/// Upper bound (inclusive) of the value range representable with `k` extra bytes, for `k` in
/// `0..=7`. `k == 8` is the escape covering the full `u64` range and isn't in this table.
const MAX_FOR_EXTRA_BYTES: [u64; 8] = [
    (1 << 7) - 1,
    (1 << 14) - 1,
    (1 << 21) - 1,
    (1 << 28) - 1,
    (1 << 35) - 1,
    (1 << 42) - 1,
    (1 << 49) - 1,
    (1 << 56) - 1,
];

/// Number of extra bytes needed to encode `value`, in `0..=8`.
fn extra_bytes_for(value: u64) -> u32 {
    for (k, &max) in MAX_FOR_EXTRA_BYTES.iter().enumerate() {
        if value <= max {
            return k as u32;
        }
    }
    8
}

/// Encodes `value` as a VLE byte sequence, appending to `out`.
pub fn write_vle(out: &mut Vec<u8>, value: u64) {
    let k = extra_bytes_for(value);
    if k == 8 {
        out.push(0xFF);
        out.extend_from_slice(&value.to_be_bytes());
        return;
    }

    let tag: u8 = if k == 0 { 0 } else { (0xFFu8) << (8 - k) };
    let high_bits = (value >> (8 * k)) as u8;
    out.push(tag | high_bits);

    if k > 0 {
        let low_bits = value & ((1u64 << (8 * k)) - 1);
        let bytes = low_bits.to_be_bytes();
        out.extend_from_slice(&bytes[(8 - k as usize)..]);
    }
}

/// Returns the number of bytes `write_vle` would emit for `value`, without writing anything.
pub fn vle_len(value: u64) -> usize {
    1 + extra_bytes_for(value) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VleError {
    #[error("unexpected end of input while reading a VLE integer")]
    ShortRead,
}

/// Decodes a VLE byte sequence from the front of `input`, returning the value and the number of
/// bytes consumed.
pub fn read_vle(input: &[u8]) -> Result<(u64, usize), VleError> {
    let &first = input.first().ok_or(VleError::ShortRead)?;

    if first == 0xFF {
        let extra = input.get(1..9).ok_or(VleError::ShortRead)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(extra);
        return Ok((u64::from_be_bytes(buf), 9));
    }

    let k = first.leading_ones();
    let payload_bits = 7 - k;
    let high_bits = (first & ((1u8 << payload_bits).wrapping_sub(1))) as u64;

    if k == 0 {
        return Ok((high_bits, 1));
    }

    let k = k as usize;
    let extra = input.get(1..1 + k).ok_or(VleError::ShortRead)?;
    let mut buf = [0u8; 8];
    buf[8 - k..].copy_from_slice(extra);
    let low_bits = u64::from_be_bytes(buf);

    Ok(((high_bits << (8 * k)) | low_bits, 1 + k))
}

/// Zig-zag encodes a signed value so that small-magnitude values (positive or negative) map to
/// small unsigned values.
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn boundary_lengths() {
        let cases: &[(u64, usize)] = &[
            (0, 1),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (u64::MAX, 9),
        ];
        for &(value, expected_len) in cases {
            let mut buf = Vec::new();
            write_vle(&mut buf, value);
            assert_eq!(buf.len(), expected_len, "value {value}");
            let (decoded, consumed) = read_vle(&buf).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn short_read_is_detected() {
        assert_eq!(read_vle(&[]), Err(VleError::ShortRead));
        // k == 1, needs 1 extra byte, but none is present.
        assert_eq!(read_vle(&[0b1000_0000]), Err(VleError::ShortRead));
        assert_eq!(read_vle(&[0xFF, 1, 2, 3]), Err(VleError::ShortRead));
    }

    #[test]
    fn zigzag_roundtrip_examples() {
        for v in [0i64, 1, -1, 2, -2, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    proptest! {
        #[test]
        fn vle_roundtrips(value: u64) {
            let mut buf = Vec::new();
            write_vle(&mut buf, value);
            let (decoded, consumed) = read_vle(&buf).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(consumed, buf.len());
            prop_assert_eq!(buf.len(), vle_len(value));
            // Below the top escape tier, length matches spec's 1 + floor(log2(u)/7) formula.
            if value > 0 && value <= MAX_FOR_EXTRA_BYTES[6] {
                let expected = 1 + (63 - value.leading_zeros() as usize) / 7;
                prop_assert_eq!(buf.len(), expected);
            }
        }

        #[test]
        fn zigzag_roundtrips(value: i64) {
            prop_assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
    }
}
