///
/// Cursor token codec
///
/// Owns the opaque hex wire format for continuation tokens; no query
/// semantics live here. Decode is bounded because tokens are untrusted
/// caller input.
///

use thiserror::Error as ThisError;

/// Decode bound for untrusted cursor token input.
const MAX_TOKEN_HEX_LEN: usize = 8 * 1024;

///
/// TokenCodecError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum TokenCodecError {
    #[error("cursor token is empty")]
    Empty,

    #[error("cursor token exceeds {MAX_TOKEN_HEX_LEN} characters")]
    TooLong,

    #[error("cursor token has an odd number of hex characters")]
    OddLength,

    #[error("cursor token has a non-hex character at position {position}")]
    InvalidHex { position: usize },
}

/// Encode raw token bytes as a lowercase hex string.
#[must_use]
pub fn encode_token(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Decode a hex token (either case, surrounding whitespace trimmed).
pub fn decode_token(token: &str) -> Result<Vec<u8>, TokenCodecError> {
    let token = token.trim();

    if token.is_empty() {
        return Err(TokenCodecError::Empty);
    }
    if token.len() > MAX_TOKEN_HEX_LEN {
        return Err(TokenCodecError::TooLong);
    }
    if token.len() % 2 != 0 {
        return Err(TokenCodecError::OddLength);
    }

    let bytes = token.as_bytes();
    let mut out = Vec::with_capacity(token.len() / 2);

    for idx in (0..bytes.len()).step_by(2) {
        let hi = hex_nibble(bytes[idx]).ok_or(TokenCodecError::InvalidHex { position: idx })?;
        let lo = hex_nibble(bytes[idx + 1])
            .ok_or(TokenCodecError::InvalidHex { position: idx + 1 })?;
        out.push((hi << 4) | lo);
    }

    Ok(out)
}

const fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_stable() {
        let raw = vec![0x00, 0x2a, 0xff];
        let token = encode_token(&raw);
        assert_eq!(token, "002aff");
        assert_eq!(decode_token(&token).unwrap(), raw);
    }

    #[test]
    fn rejects_empty_odd_and_non_hex() {
        assert_eq!(decode_token("  "), Err(TokenCodecError::Empty));
        assert_eq!(decode_token("abc"), Err(TokenCodecError::OddLength));
        assert_eq!(
            decode_token("zz"),
            Err(TokenCodecError::InvalidHex { position: 0 })
        );
    }

    #[test]
    fn accepts_mixed_case_with_whitespace() {
        assert_eq!(decode_token(" 0AfF ").unwrap(), vec![0x0a, 0xff]);
    }

    #[test]
    fn enforces_the_length_bound() {
        let oversized = "ab".repeat(MAX_TOKEN_HEX_LEN / 2 + 1);
        assert_eq!(decode_token(&oversized), Err(TokenCodecError::TooLong));
    }
}
