//! Fixed-width hexadecimal codec for 64-bit span and trace identifiers.
//!
//! Identifiers travel on the wire as lowercase hex strings: 16 characters
//! for a 64-bit id, 32 characters for a 128-bit trace id. The codec is
//! strict about width so that a truncated or padded header never silently
//! decodes to a different identifier.

use crate::error::PropagationError;

/// Encodes a 64-bit identifier as a 16-character lowercase hex string.
///
/// # Example
///
/// ```
/// use amqp_trace_propagation::id::id_to_hex;
///
/// assert_eq!(id_to_hex(456), "00000000000001c8");
/// ```
pub fn id_to_hex(id: u64) -> String {
    format!("{id:016x}")
}

/// Decodes a 64-bit identifier from a hex string.
///
/// Accepts either a 16-character id or a 32-character trace id, in which
/// case the low 64 bits (the last 16 characters) are returned. Any other
/// width, or any non-hex character, is a [`PropagationError::MalformedIdentifier`].
pub fn hex_to_id(hex: &str) -> Result<u64, PropagationError> {
    if hex.len() != 16 && hex.len() != 32 {
        return Err(malformed(hex, 16));
    }
    validate_hex(hex)?;
    parse_word(&hex[hex.len() - 16..], hex)
}

/// Decodes 64 bits from a 32-character trace id starting at `offset`.
///
/// Used to pull the high word out of a 128-bit trace id: `hex_to_id_at(s, 0)`
/// parses the first 16 characters.
pub fn hex_to_id_at(hex: &str, offset: usize) -> Result<u64, PropagationError> {
    if hex.len() != 32 || offset + 16 > hex.len() {
        return Err(malformed(hex, 32));
    }
    validate_hex(hex)?;
    parse_word(&hex[offset..offset + 16], hex)
}

/// Validates the whole string before any slicing, so a multi-byte character
/// can never land on a slice boundary. Also rejects the leading '+' that
/// `from_str_radix` would tolerate.
fn validate_hex(hex: &str) -> Result<(), PropagationError> {
    if hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(malformed(hex, hex.len()))
    }
}

fn parse_word(word: &str, original: &str) -> Result<u64, PropagationError> {
    u64::from_str_radix(word, 16).map_err(|_| malformed(original, original.len()))
}

fn malformed(value: &str, expected: usize) -> PropagationError {
    PropagationError::MalformedIdentifier {
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_to_hex_zero_padded() {
        assert_eq!(id_to_hex(0x1c8), "00000000000001c8");
        assert_eq!(id_to_hex(0), "0000000000000000");
        assert_eq!(id_to_hex(u64::MAX), "ffffffffffffffff");
    }

    #[test]
    fn test_hex_to_id_64_bit() {
        assert_eq!(hex_to_id("00000000000001c8").unwrap(), 456);
        assert_eq!(hex_to_id("ffffffffffffffff").unwrap(), u64::MAX);
    }

    #[test]
    fn test_hex_to_id_128_bit_returns_low_word() {
        let id = hex_to_id("00000000000000010000000000000456").unwrap();
        assert_eq!(id, 0x456);
    }

    #[test]
    fn test_hex_to_id_at_high_word() {
        let high = hex_to_id_at("00000000000000010000000000000456", 0).unwrap();
        assert_eq!(high, 1);
    }

    #[test]
    fn test_round_trip() {
        for id in [0u64, 1, 456, 0xdeadbeefcafef00d, u64::MAX] {
            assert_eq!(hex_to_id(&id_to_hex(id)).unwrap(), id);
        }
    }

    #[test]
    fn test_rejects_wrong_width() {
        assert!(hex_to_id("1c8").is_err());
        assert!(hex_to_id("00000000000001c80").is_err());
        assert!(hex_to_id("").is_err());
        assert!(hex_to_id_at("00000000000001c8", 0).is_err()); // 16 chars, not 32
    }

    #[test]
    fn test_rejects_non_hex_characters() {
        assert!(hex_to_id("00000000000001cg").is_err());
        assert!(hex_to_id("+0000000000001c8").is_err());
        assert!(hex_to_id("-0000000000001c8").is_err());
    }

    #[test]
    fn test_rejects_multibyte_characters_without_panicking() {
        // 32 bytes with a two-byte character straddling byte index 16.
        let id = format!("000000000000000é{}", "0".repeat(15));
        assert_eq!(id.len(), 32);
        assert!(hex_to_id(&id).is_err());
        assert!(hex_to_id_at(&id, 0).is_err());

        // 16 bytes, multi-byte character at the end.
        assert!(hex_to_id("00000000000000é").is_err());
    }
}
