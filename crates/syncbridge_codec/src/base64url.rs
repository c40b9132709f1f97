//! Unpadded URL-safe base64, as used for upstream record ids and assertion segments.

use crate::error::{CodecError, CodecResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Encodes bytes as URL-safe base64 without padding.
pub fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

/// Decodes URL-safe base64, with or without trailing padding.
pub fn base64url_decode(input: &str) -> CodecResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|e| CodecError::invalid_base64(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_has_no_padding() {
        assert_eq!(base64url_encode(b"foobar"), "Zm9vYmFy");
        assert_eq!(base64url_encode(b"fooba"), "Zm9vYmE");
        assert_eq!(base64url_encode(&[0xfb, 0xff]), "-_8");
    }

    #[test]
    fn decode_tolerates_missing_padding() {
        assert_eq!(base64url_decode("Zm9vYmE").unwrap(), b"fooba");
        assert_eq!(base64url_decode("Zm9vYmE=").unwrap(), b"fooba");
        assert_eq!(base64url_decode("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn decode_rejects_standard_alphabet() {
        assert!(base64url_decode("+/8").is_err());
    }
}
