//! Assertion command implementation.

use super::bare_assertion;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use syncbridge_auth::{ttl_from_assertion, AssertionClaims, ClaimTimestamp};

/// One timestamp claim as reported to the user.
#[derive(Debug, Serialize)]
pub struct TimestampReport {
    /// Segment index.
    pub segment: usize,
    /// Claim name.
    pub claim: String,
    /// Seconds since epoch.
    pub seconds: f64,
    /// RFC 3339 date, when representable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl From<&ClaimTimestamp> for TimestampReport {
    fn from(ts: &ClaimTimestamp) -> Self {
        Self {
            segment: ts.segment,
            claim: ts.name.clone(),
            seconds: ts.seconds,
            date: ts.to_datetime().map(|d| d.to_rfc3339()),
        }
    }
}

/// Assertion inspection result.
#[derive(Debug, Serialize)]
pub struct AssertionReport {
    /// Decoded JSON segments.
    pub segments: Vec<Map<String, Value>>,
    /// Timestamp claims.
    pub timestamps: Vec<TimestampReport>,
    /// Seconds until the earliest expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// Builds the report for `input`.
pub fn inspect(input: &str, now: i64) -> AssertionReport {
    let assertion = bare_assertion(input);
    let claims = AssertionClaims::decode(assertion);
    AssertionReport {
        timestamps: claims.timestamps().iter().map(TimestampReport::from).collect(),
        ttl: ttl_from_assertion(assertion, now),
        segments: claims.segments,
    }
}

/// Runs the assertion command.
pub fn run(input: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let report = inspect(input, Utc::now().timestamp());
    if report.segments.is_empty() {
        return Err("No decodable segment in assertion".into());
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_text(&report)?,
        other => return Err(format!("Unknown format: {other}").into()),
    }
    Ok(())
}

fn print_text(report: &AssertionReport) -> Result<(), Box<dyn std::error::Error>> {
    for (index, segment) in report.segments.iter().enumerate() {
        println!("segment {index}:");
        println!("{}", serde_json::to_string_pretty(segment)?);
    }
    println!();
    for ts in &report.timestamps {
        println!(
            "{:<16} {} (segment {})",
            ts.claim,
            ts.date.as_deref().unwrap_or("out of range"),
            ts.segment
        );
    }
    match report.ttl {
        Some(ttl) if ttl > 0 => println!("expires in {ttl}s"),
        Some(ttl) => println!("expired {}s ago", ttl.unsigned_abs()),
        None => println!("no expiry claim"),
    }
    Ok(())
}
