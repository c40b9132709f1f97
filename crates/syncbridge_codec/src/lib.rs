//! # SyncBridge Codec
//!
//! Bidirectional mapping between upstream sync record ids and the UUID4-shaped
//! identifiers exposed to document clients.
//!
//! Upstream ids are usually 9 raw bytes, written as 12 unpadded base64url
//! characters. Clients only accept UUID4 strings, so short payloads are padded
//! and two marker bytes (`0x40` version byte, `0x80` variant byte) are spliced
//! in to make a syntactically valid UUID4. Genuine 16-byte UUID4 payloads pass
//! through unchanged.
//!
//! ```
//! use syncbridge_codec::{base64_to_uuid4, uuid4_to_base64};
//!
//! let external = base64_to_uuid4("AAECAwQFBgcI").unwrap();
//! assert_eq!(external, "00010203-0405-4006-8007-080000000000");
//! assert_eq!(uuid4_to_base64(&external).unwrap(), "AAECAwQFBgcI");
//! ```
//!
//! ## Known ambiguity
//!
//! A random UUID4 whose byte 6 is `0x40` and byte 8 is `0x80` cannot be told
//! apart from a manufactured one and decodes as if it were manufactured.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod base64url;
mod error;
mod uuid4;

pub use base64url::{base64url_decode, base64url_encode};
pub use error::{CodecError, CodecResult};
pub use uuid4::{bytes_to_uuid4, is_uuid4, uuid4_to_bytes, MIN_ID_LEN};

/// Converts an upstream base64url record id into its client-facing UUID4 form.
pub fn base64_to_uuid4(sync_id: &str) -> CodecResult<String> {
    bytes_to_uuid4(&base64url_decode(sync_id)?)
}

/// Converts a client-facing UUID4 id back into the upstream base64url form.
pub fn uuid4_to_base64(uuid4: &str) -> CodecResult<String> {
    Ok(base64url_encode(&uuid4_to_bytes(uuid4)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::RngCore;

    fn random_uuid4() -> String {
        uuid::Uuid::new_v4().hyphenated().to_string()
    }

    #[test]
    fn known_nine_byte_id() {
        let external = base64_to_uuid4("Xzk1aVBHdVk1").unwrap();
        assert_eq!(external, "5f393569-5047-4075-8059-350000000000");
        assert_eq!(uuid4_to_base64(&external).unwrap(), "Xzk1aVBHdVk1");
    }

    #[test]
    fn known_sixteen_byte_id() {
        let external = base64_to_uuid4("Y_-5-LEeQBuh60IT0MyWEQ").unwrap();
        assert_eq!(external, "63ffb9f8-b11e-401b-a1eb-4213d0cc9611");
        assert_eq!(uuid4_to_base64(&external).unwrap(), "Y_-5-LEeQBuh60IT0MyWEQ");
    }

    #[test]
    fn base64_id_roundtrip() {
        let mut bytes = [0u8; 9];
        rand::thread_rng().fill_bytes(&mut bytes);
        let sync_id = base64url_encode(&bytes);

        let external = base64_to_uuid4(&sync_id).unwrap();
        assert_eq!(uuid4_to_base64(&external).unwrap(), sync_id);
    }

    #[test]
    fn random_uuid4_roundtrip_through_base64() {
        for _ in 0..64 {
            let external = random_uuid4();
            let bytes = uuid::Uuid::parse_str(&external).unwrap().into_bytes();
            let ambiguous = (bytes[6] == 0x40 && bytes[8] == 0x80) || bytes[14..] == [0, 0];
            if ambiguous {
                continue;
            }
            let sync_id = uuid4_to_base64(&external).unwrap();
            assert_eq!(base64_to_uuid4(&sync_id).unwrap(), external);
        }
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            base64_to_uuid4("not base64!"),
            Err(CodecError::InvalidBase64 { .. })
        ));
    }

    proptest! {
        #[test]
        fn every_sync_id_maps_to_a_uuid4(bytes in prop::array::uniform9(any::<u8>())) {
            let external = base64_to_uuid4(&base64url_encode(&bytes)).unwrap();
            prop_assert!(is_uuid4(&external));
        }
    }
}
