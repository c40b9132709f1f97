//! Identity assertion handling.
//!
//! Assertions are opaque to the gateway: nothing here verifies a signature.
//! The only thing read out of them is the expiry, to bound how long derived
//! credentials may be cached.

use crate::error::{AuthError, AuthResult};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use syncbridge_codec::base64url_decode;

/// Request header carrying the assertion.
pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Request header carrying the client-state token.
pub const CLIENT_STATE_HEADER: &str = "X-Client-State";

const SCHEME: &str = "browserid ";
const MISSING_ASSERTION: &str = "Provide a BID assertion Authorization header.";
const MISSING_CLIENT_STATE: &str = "Provide the tokenserver X-Client-State header.";

/// Claims worth reporting when inspecting an assertion.
const TIMESTAMP_CLAIMS: &[&str] = &["iat", "exp", "fxa-generation", "fxa-lastAuthAt"];

/// Extracts the assertion from an `Authorization: BrowserID <assertion>` value.
///
/// The scheme is matched case-insensitively.
pub fn parse_authorization(header: Option<&str>) -> AuthResult<&str> {
    let header = header.ok_or_else(|| AuthError::missing(MISSING_ASSERTION))?;
    let has_scheme = header
        .get(..SCHEME.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SCHEME));
    if !has_scheme {
        return Err(AuthError::missing(MISSING_ASSERTION));
    }

    let assertion = header[SCHEME.len()..].trim();
    if assertion.is_empty() {
        return Err(AuthError::missing(MISSING_ASSERTION));
    }
    Ok(assertion)
}

/// Checks the client-state header is present and non-empty.
pub fn parse_client_state(header: Option<&str>) -> AuthResult<&str> {
    match header.map(str::trim) {
        Some(state) if !state.is_empty() => Ok(state),
        _ => Err(AuthError::missing(MISSING_CLIENT_STATE)),
    }
}

/// Decodes every `.`-separated segment that is base64url JSON object.
fn json_segments(assertion: &str) -> impl Iterator<Item = Map<String, Value>> + '_ {
    assertion.split('.').filter_map(|segment| {
        let bytes = base64url_decode(segment).ok()?;
        match serde_json::from_slice(&bytes).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        }
    })
}

/// Seconds until the earliest `exp` found in the assertion, relative to `now`
/// (seconds since epoch).
///
/// `exp` claims are in milliseconds. Segments that do not decode contribute
/// nothing; `None` means no segment carried a finite numeric `exp`. The
/// result may be zero or negative for an expired assertion, and saturates
/// at the `i64` bounds for out-of-range claims.
pub fn ttl_from_assertion(assertion: &str, now: i64) -> Option<i64> {
    json_segments(assertion)
        .filter_map(|claims| claims.get("exp").and_then(Value::as_f64))
        .filter(|exp_ms| exp_ms.is_finite())
        .map(|exp_ms| ((exp_ms / 1000.0).floor() as i64).saturating_sub(now))
        .min()
}

/// A timestamp claim found in an assertion segment.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTimestamp {
    /// Index of the segment it was found in.
    pub segment: usize,
    /// Claim name.
    pub name: String,
    /// Value as seconds since epoch.
    pub seconds: f64,
}

impl ClaimTimestamp {
    /// Formats the timestamp as a UTC date.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.seconds.floor() as i64, 0)
    }
}

/// Decoded view of an assertion, for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct AssertionClaims {
    /// JSON segments in order; signatures are skipped.
    pub segments: Vec<Map<String, Value>>,
}

impl AssertionClaims {
    /// Decodes the JSON segments of `assertion`.
    pub fn decode(assertion: &str) -> Self {
        Self {
            segments: json_segments(assertion).collect(),
        }
    }

    /// Lists the well-known timestamp claims, normalized to seconds.
    ///
    /// Values with more than 11 digits are taken to be milliseconds.
    pub fn timestamps(&self) -> Vec<ClaimTimestamp> {
        let mut found = Vec::new();
        for (index, claims) in self.segments.iter().enumerate() {
            for name in TIMESTAMP_CLAIMS {
                let Some(raw) = claims.get(*name) else {
                    continue;
                };
                let Some(value) = raw.as_f64() else {
                    continue;
                };
                let digits = raw.to_string().trim_start_matches('-').len();
                let seconds = if digits > 11 { value / 1e3 } else { value };
                found.push(ClaimTimestamp {
                    segment: index,
                    name: (*name).to_string(),
                    seconds,
                });
            }
        }
        found
    }
}
