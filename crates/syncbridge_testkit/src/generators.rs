//! Property-based test generators using proptest.

use proptest::prelude::*;
use serde_json::Value;
use syncbridge_codec::{base64url_encode, bytes_to_uuid4, MIN_ID_LEN};

/// Strategy for sync ids as the backend issues them: twelve base64url characters.
pub fn sync_id_strategy() -> impl Strategy<Value = String> {
    prop::array::uniform9(any::<u8>()).prop_map(|bytes| base64url_encode(&bytes))
}

/// Strategy for record ids the gateway can map back to a sync id.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), MIN_ID_LEN..=12)
        .prop_filter_map("payload must map to a uuid", |bytes| {
            bytes_to_uuid4(&bytes).ok()
        })
}

/// Strategy for ETag values: a quoted millisecond timestamp.
pub fn etag_strategy() -> impl Strategy<Value = String> {
    (1_000_000_000_000u64..2_000_000_000_000).prop_map(|ms| format!("\"{ms}\""))
}

/// Strategy for client-state tokens: 32 lowercase hex digits.
pub fn client_state_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9a-f]{32}").expect("Invalid regex")
}

/// Strategy for record payloads as clients send them.
pub fn payload_strategy() -> impl Strategy<Value = Value> {
    (
        prop::string::string_regex("[A-Za-z0-9+/=]{0,64}").expect("Invalid regex"),
        prop::option::of(-1000i64..1000),
    )
        .prop_map(|(payload, sortindex)| {
            let mut data = serde_json::json!({ "payload": payload });
            if let Some(index) = sortindex {
                data["sortindex"] = Value::from(index);
            }
            data
        })
}
