//! Hex codec for the opaque continuation-token string.

// Upper bound on accepted token length; tokens arrive from callers.
const MAX_TOKEN_HEX_LEN: usize = 8 * 1024;

///
/// HexDecodeError
///

#[derive(Debug, Eq, thiserror::Error, PartialEq)]
pub enum HexDecodeError {
    #[error("token is empty")]
    Empty,

    #[error("token exceeds max length: {len} hex chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("token must have an even number of hex characters")]
    OddLength,

    #[error("invalid hex character at position {position}")]
    InvalidHex { position: usize },
}

/// Encode bytes as a lowercase hex string.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Decode a hex token, either case, ignoring surrounding whitespace.
pub fn decode_hex(token: &str) -> Result<Vec<u8>, HexDecodeError> {
    let token = token.trim();

    if token.is_empty() {
        return Err(HexDecodeError::Empty);
    }
    if token.len() > MAX_TOKEN_HEX_LEN {
        return Err(HexDecodeError::TooLong {
            len: token.len(),
            max: MAX_TOKEN_HEX_LEN,
        });
    }
    if !token.len().is_multiple_of(2) {
        return Err(HexDecodeError::OddLength);
    }

    token
        .as_bytes()
        .chunks_exact(2)
        .enumerate()
        .map(|(idx, pair)| {
            let hi = nibble(pair[0]).ok_or(HexDecodeError::InvalidHex { position: idx * 2 + 1 })?;
            let lo = nibble(pair[1]).ok_or(HexDecodeError::InvalidHex { position: idx * 2 + 2 })?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

const fn nibble(byte: u8) -> Option<u8> {
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
