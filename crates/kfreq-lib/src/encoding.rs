//! DNA nucleotide encoding
//!
//! 2-bit encoding scheme for DNA nucleotides:
//! - A (65/97)  -> 00
//! - C (67/99)  -> 01
//! - G (71/103) -> 10
//! - T (84/116) -> 11
//!
//! Any other byte (N included) has no code; the extractor treats it as a
//! hard window break.

use thiserror::Error;

/// Error type for encoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The input byte is not a valid DNA base (A/C/G/T)
    #[error("Invalid DNA base: {0:?}")]
    InvalidBase(u8),
}

/// Encode a single DNA nucleotide to 2 bits
///
/// A -> 00, C -> 01, G -> 10, T -> 11
#[inline]
pub const fn encode_base(base: u8) -> Result<u8, EncodingError> {
    match base {
        b'A' | b'a' => Ok(0b00),
        b'C' | b'c' => Ok(0b01),
        b'G' | b'g' => Ok(0b10),
        b'T' | b't' => Ok(0b11),
        _ => Err(EncodingError::InvalidBase(base)),
    }
}

/// Decode a 2-bit value to DNA nucleotide (uppercase)
#[inline]
pub const fn decode_base(bits: u8) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b10 => b'G',
        _ => b'T',
    }
}

/// Check whether a byte has a 2-bit code.
#[inline]
pub const fn is_acgt(base: u8) -> bool {
    encode_base(base).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_base() {
        assert_eq!(encode_base(b'A').unwrap(), 0b00);
        assert_eq!(encode_base(b'a').unwrap(), 0b00);
        assert_eq!(encode_base(b'C').unwrap(), 0b01);
        assert_eq!(encode_base(b'c').unwrap(), 0b01);
        assert_eq!(encode_base(b'G').unwrap(), 0b10);
        assert_eq!(encode_base(b'g').unwrap(), 0b10);
        assert_eq!(encode_base(b'T').unwrap(), 0b11);
        assert_eq!(encode_base(b't').unwrap(), 0b11);

        // Invalid bases
        assert!(encode_base(b'N').is_err());
        assert!(encode_base(b'X').is_err());
        assert!(encode_base(b'0').is_err());
    }

    #[test]
    fn test_decode_base() {
        assert_eq!(decode_base(0b00), b'A');
        assert_eq!(decode_base(0b01), b'C');
        assert_eq!(decode_base(0b10), b'G');
        assert_eq!(decode_base(0b11), b'T');
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        for base in [b'A', b'C', b'G', b'T'] {
            assert_eq!(decode_base(encode_base(base).unwrap()), base);
        }
    }

    #[test]
    fn test_is_acgt() {
        assert!(is_acgt(b'A'));
        assert!(is_acgt(b'g'));
        assert!(!is_acgt(b'N'));
        assert!(!is_acgt(b'\n'));
    }
}
