//! Benchmark utilities.

use rand::Rng;

/// Generate random bytes of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a batch of nine-byte sync record ids.
pub fn generate_sync_ids(count: usize) -> Vec<String> {
    (0..count)
        .map(|_| syncbridge_codec::base64url_encode(&random_data(9)))
        .collect()
}

/// Generate an upstream listing of `count` records.
pub fn generate_listing(count: usize, payload_size: usize) -> serde_json::Value {
    let payload = syncbridge_codec::base64url_encode(&random_data(payload_size));
    let records: Vec<serde_json::Value> = generate_sync_ids(count)
        .into_iter()
        .enumerate()
        .map(|(i, id)| {
            serde_json::json!({
                "id": id,
                "modified": 1437747842.5 + i as f64 / 100.0,
                "payload": payload,
                "sortindex": i,
            })
        })
        .collect();
    serde_json::Value::Array(records)
}
