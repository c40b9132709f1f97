//! End-to-end translation of a conditional write and a listing response.

use proptest::prelude::*;
use syncbridge_protocol::{
    export_response, import_conditional, names, records_to_client, ClientError,
    CollectionQuery, ConditionalHeaders, ErrorTranslator, Headers, ResponseContext,
    UpstreamError, UpstreamFailure,
};

#[test]
fn conditional_write_then_conflict() {
    let request = Headers::new().with(names::IF_MATCH, "\"14377478425700\"");
    let upstream = import_conditional(&ConditionalHeaders::from_headers(&request)).unwrap();
    assert_eq!(
        upstream.get(names::X_IF_UNMODIFIED_SINCE),
        Some("14377478425.70")
    );

    let failure: UpstreamError = UpstreamFailure::new(412, "Precondition Failed", "").into();
    let client = ErrorTranslator::new().translate(&failure);
    assert_eq!(client.status, 412);
    assert_eq!(client.message(), Some("Resource was modified meanwhile"));
}

#[test]
fn create_only_write() {
    let conditions = ConditionalHeaders::new().with_if_none_match("*");
    let upstream = import_conditional(&conditions).unwrap();
    assert_eq!(upstream.get(names::X_IF_UNMODIFIED_SINCE), Some("0"));
}

#[test]
fn full_listing_response() {
    let query = CollectionQuery::from_params([("_sort", "newest")]).unwrap();
    let upstream_headers = Headers::new()
        .with(names::X_LAST_MODIFIED, "14377478425.69")
        .with(names::X_WEAVE_RECORDS, "2")
        .with(names::X_WEAVE_QUOTA_REMAINING, "100");
    let body = serde_json::json!([
        {"id": "Xzk1aVBHdVk1", "modified": 14377478425.69},
        {"id": "Y_-5-LEeQBuh60IT0MyWEQ", "modified": 14377478420.0}
    ]);

    let context = ResponseContext::listing(query.is_paginated());
    let headers = export_response(&upstream_headers, &context).unwrap();
    let records = records_to_client(body).unwrap();

    assert_eq!(headers.get(names::ETAG), Some("\"14377478425690\""));
    assert_eq!(headers.get(names::TOTAL_RECORDS), Some("2"));
    assert_eq!(headers.get(names::QUOTA_REMAINING), Some("100"));
    assert_eq!(records[1]["id"], "63ffb9f8-b11e-401b-a1eb-4213d0cc9611");
}

#[test]
fn bad_header_becomes_invalid_parameters() {
    let err = import_conditional(&ConditionalHeaders::new().with_if_match("abc")).unwrap_err();
    let client: ClientError = err.into();
    assert_eq!(client.status, 400);
    assert_eq!(client.errno(), Some(107));
}

proptest! {
    #[test]
    fn if_match_keeps_two_decimals(ms in 0u64..10_000_000_000_000) {
        let conditions = ConditionalHeaders::new().with_if_match(format!("\"{ms}\""));
        let upstream = import_conditional(&conditions).unwrap();
        let value = upstream.get(names::X_IF_UNMODIFIED_SINCE).unwrap();
        let (_, fraction) = value.split_once('.').unwrap();
        prop_assert_eq!(fraction.len(), 2);
        let seconds: f64 = value.parse().unwrap();
        prop_assert!((seconds * 1000.0 - ms as f64).abs() <= 5.0);
    }

    #[test]
    fn etag_is_rounded_milliseconds(centis in 0u64..1_000_000_000_000) {
        let seconds = format!("{}.{:02}", centis / 100, centis % 100);
        let upstream = Headers::new().with(names::X_LAST_MODIFIED, seconds);
        let headers = export_response(&upstream, &ResponseContext::record()).unwrap();
        prop_assert_eq!(headers.get(names::ETAG).unwrap().to_string(), format!("\"{}\"", centis * 10));
    }
}
