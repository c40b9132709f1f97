//! Record body translation.
//!
//! Upstream records carry a base64url `id` and a `modified` timestamp in
//! seconds; clients see a UUID4 `id` and `last_modified` in milliseconds.

use crate::error::{ProtocolError, ProtocolResult};
use serde_json::{Map, Value};
use syncbridge_codec::{base64_to_uuid4, uuid4_to_base64};

/// Upstream fields a client may write.
const WRITABLE_FIELDS: &[&str] = &["payload", "sortindex", "ttl"];

/// Converts one upstream record into its client form.
///
/// # Errors
///
/// Fails if the record is not an object, lacks a string `id` or a numeric
/// `modified`, or its id cannot be mapped to a UUID4.
pub fn record_to_client(record: Value) -> ProtocolResult<Value> {
    let Value::Object(mut fields) = record else {
        return Err(ProtocolError::malformed_record("record is not an object"));
    };

    let modified = fields
        .remove("modified")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ProtocolError::malformed_record("missing numeric modified"))?;
    let sync_id = match fields.remove("id") {
        Some(Value::String(id)) => id,
        _ => return Err(ProtocolError::malformed_record("missing string id")),
    };

    let external = base64_to_uuid4(&sync_id)
        .map_err(|e| ProtocolError::malformed_record(format!("record id {sync_id:?}: {e}")))?;

    fields.insert("id".into(), Value::String(external));
    fields.insert(
        "last_modified".into(),
        Value::from((modified * 1000.0).round() as u64),
    );
    Ok(Value::Object(fields))
}

/// Converts an upstream listing body (a JSON array) into client records.
pub fn records_to_client(listing: Value) -> ProtocolResult<Vec<Value>> {
    match listing {
        Value::Array(records) => records.into_iter().map(record_to_client).collect(),
        _ => Err(ProtocolError::malformed_record("listing is not an array")),
    }
}

/// Builds the upstream record for a client write to `record_id`.
///
/// Only the writable upstream fields of `data` are kept; client-side metadata
/// such as `last_modified` is dropped.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidIdentifier`] for a bad `record_id` and
/// [`ProtocolError::InvalidParameter`] if `data` is not an object.
pub fn record_to_upstream(record_id: &str, data: &Value) -> ProtocolResult<Value> {
    let fields = data
        .as_object()
        .ok_or_else(|| ProtocolError::invalid_parameter("data", "data should be an object"))?;

    let mut upstream = Map::new();
    upstream.insert("id".into(), Value::String(uuid4_to_base64(record_id)?));
    for name in WRITABLE_FIELDS {
        if let Some(value) = fields.get(*name) {
            upstream.insert((*name).into(), value.clone());
        }
    }
    Ok(Value::Object(upstream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upstream_record_becomes_client_record() {
        let record = json!({
            "id": "Xzk1aVBHdVk1",
            "modified": 14377478425.69,
            "payload": "{}",
            "sortindex": 3
        });
        let client = record_to_client(record).unwrap();
        assert_eq!(
            client,
            json!({
                "id": "5f393569-5047-4075-8059-350000000000",
                "last_modified": 14377478425690u64,
                "payload": "{}",
                "sortindex": 3
            })
        );
    }

    #[test]
    fn malformed_records_are_rejected() {
        for record in [
            json!("nope"),
            json!({"id": "Xzk1aVBHdVk1"}),
            json!({"modified": 1.0}),
            json!({"id": 12, "modified": 1.0}),
            json!({"id": "!!!", "modified": 1.0}),
        ] {
            assert!(matches!(
                record_to_client(record),
                Err(ProtocolError::MalformedRecord { .. })
            ));
        }
    }

    #[test]
    fn listing_translation() {
        let listing = json!([
            {"id": "Xzk1aVBHdVk1", "modified": 1.0},
            {"id": "AAECAwQFBgcI", "modified": 2.5}
        ]);
        let records = records_to_client(listing).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], "00010203-0405-4006-8007-080000000000");
        assert_eq!(records[1]["last_modified"], 2500);

        assert!(records_to_client(json!({"data": []})).is_err());
    }

    #[test]
    fn client_write_keeps_only_writable_fields() {
        let data = json!({
            "payload": "encrypted",
            "sortindex": 1,
            "last_modified": 1234,
            "id": "ignored"
        });
        let upstream =
            record_to_upstream("5f393569-5047-4075-8059-350000000000", &data).unwrap();
        assert_eq!(
            upstream,
            json!({"id": "Xzk1aVBHdVk1", "payload": "encrypted", "sortindex": 1})
        );
    }

    #[test]
    fn client_write_with_bad_id() {
        let err = record_to_upstream("not-a-uuid", &json!({})).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidIdentifier(_)));

        let err = record_to_upstream("5f393569-5047-4075-8059-350000000000", &json!([]))
            .unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameter { .. }));
    }
}
