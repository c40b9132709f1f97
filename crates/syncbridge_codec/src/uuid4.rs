//! Raw bytes <-> UUID4 string conversion.

use crate::error::{CodecError, CodecResult};
use uuid::Uuid;

/// Length of a UUID in bytes.
const UUID_LEN: usize = 16;
/// Largest payload that fits next to the two marker bytes.
const SPLICED_PAYLOAD_LEN: usize = 14;
/// Marker written at byte 6 (version nibble 4).
const VERSION_MARKER: u8 = 0x40;
/// Marker written at byte 8 (RFC 4122 variant).
const VARIANT_MARKER: u8 = 0x80;

/// Minimum decoded id length; shorter payloads are zero-padded up to it.
pub const MIN_ID_LEN: usize = 9;

/// Returns true if `bytes` has the UUID4 version and variant nibbles.
fn has_uuid4_layout(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[6] >> 4 == 0x4 && (0x8..=0xb).contains(&(bytes[8] >> 4))
}

/// Returns true if `value` is a lowercase, hyphenated UUID4 string.
pub fn is_uuid4(value: &str) -> bool {
    if value.len() != 36 || value.chars().any(|c| c.is_ascii_uppercase()) {
        return false;
    }
    match Uuid::try_parse(value) {
        Ok(uuid) => {
            uuid.hyphenated().to_string() == value && has_uuid4_layout(uuid.as_bytes())
        }
        Err(_) => false,
    }
}

/// Encodes a raw id as a UUID4 string.
///
/// - Payloads longer than 14 bytes are treated as genuine random ids: they must
///   already carry the UUID4 layout and are zero-padded to 16 bytes.
/// - Shorter payloads are zero-padded to 14 bytes and the two marker bytes are
///   spliced in at offsets 6 and 8.
///
/// # Errors
///
/// Returns [`CodecError::InvalidIdentifier`] when a long payload is not a
/// UUID4 or is longer than 16 bytes.
pub fn bytes_to_uuid4(payload: &[u8]) -> CodecResult<String> {
    let mut bytes = [0u8; UUID_LEN];

    if payload.len() > SPLICED_PAYLOAD_LEN {
        if payload.len() > UUID_LEN || !has_uuid4_layout(payload) {
            return Err(CodecError::invalid_identifier(
                "bytes array cannot be converted into an UUID4",
            ));
        }
        bytes[..payload.len()].copy_from_slice(payload);
    } else {
        let mut padded = [0u8; SPLICED_PAYLOAD_LEN];
        padded[..payload.len()].copy_from_slice(payload);

        bytes[..6].copy_from_slice(&padded[..6]);
        bytes[6] = VERSION_MARKER;
        bytes[7] = padded[6];
        bytes[8] = VARIANT_MARKER;
        bytes[9..].copy_from_slice(&padded[7..]);
    }

    Ok(Uuid::from_bytes(bytes).hyphenated().to_string())
}

/// Decodes a UUID4 string back into the raw id.
///
/// Manufactured ids (marker bytes present) lose their markers; trailing zero
/// bytes are stripped and the result is padded to at least [`MIN_ID_LEN`].
pub fn uuid4_to_bytes(uuid4: &str) -> CodecResult<Vec<u8>> {
    let uuid = Uuid::try_parse(uuid4)
        .map_err(|e| CodecError::invalid_identifier(format!("{uuid4:?} is not a UUID: {e}")))?;
    let bytes = uuid.as_bytes();

    let mut payload = if bytes[6] == VERSION_MARKER && bytes[8] == VARIANT_MARKER {
        let mut stripped = Vec::with_capacity(SPLICED_PAYLOAD_LEN);
        stripped.extend_from_slice(&bytes[..6]);
        stripped.push(bytes[7]);
        stripped.extend_from_slice(&bytes[9..]);
        stripped
    } else {
        bytes.to_vec()
    };

    let used = payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    payload.truncate(used);
    if payload.len() < MIN_ID_LEN {
        payload.resize(MIN_ID_LEN, 0);
    }

    Ok(payload)
}
