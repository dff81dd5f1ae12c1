//! Transport encoding for binary credential fields.
//!
//! Binary fields travel as standard, padded base64 (the browser `btoa` form),
//! which the server peer reverses with a plain base64 decode.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::error::Result;

/// Encode a binary buffer for JSON transport.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encode a nullable buffer. A missing buffer encodes the same as an empty one.
pub fn encode_optional(bytes: Option<&[u8]>) -> String {
    bytes.map(encode).unwrap_or_default()
}

/// Decode a transported field back to raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

/// Re-encode a transported field as unpadded base64url, the form webauthn-rs expects.
pub fn to_url_safe(text: &str) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(decode(text)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_encodes_to_empty_text() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_matches_btoa_output() {
        // btoa(String.fromCharCode(0xfb, 0xff, 0x00)) === "+/8A"
        assert_eq!(encode(&[0xfb, 0xff, 0x00]), "+/8A");
        assert_eq!(encode(b"passkey"), "cGFzc2tleQ==");
    }

    #[test]
    fn test_round_trip_all_byte_values() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_missing_buffer_encodes_empty() {
        assert_eq!(encode_optional(None), "");
        assert_eq!(encode_optional(Some(b"id")), "aWQ=");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not base64!").is_err());
    }

    #[test]
    fn test_url_safe_reencoding() {
        assert_eq!(to_url_safe("+/8A").unwrap(), "-_8A");
        assert_eq!(to_url_safe("cGFzc2tleQ==").unwrap(), "cGFzc2tleQ");
    }
}
