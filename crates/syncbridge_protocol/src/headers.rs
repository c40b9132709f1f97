//! Conditional and response header translation.
//!
//! Clients speak ETags: a quoted decimal holding the last modification time in
//! milliseconds. The backend speaks seconds with two decimals in
//! `X-If-Unmodified-Since` / `X-If-Modified-Since` / `X-Last-Modified`.

use crate::error::{ProtocolError, ProtocolResult};
use crate::header_set::Headers;
use chrono::{DateTime, Utc};
use url::{Position, Url};

/// Header names on both sides of the gateway.
pub mod names {
    /// Client conditional write header.
    pub const IF_MATCH: &str = "If-Match";
    /// Client conditional read/create header.
    pub const IF_NONE_MATCH: &str = "If-None-Match";
    /// Client version tag.
    pub const ETAG: &str = "ETag";
    /// Client last modification date.
    pub const LAST_MODIFIED: &str = "Last-Modified";
    /// Client continuation link.
    pub const NEXT_PAGE: &str = "Next-Page";
    /// Client total count for full listings.
    pub const TOTAL_RECORDS: &str = "Total-Records";
    /// Client quota advisory.
    pub const QUOTA_REMAINING: &str = "Quota-Remaining";
    /// Client alert advisory.
    pub const ALERT: &str = "Alert";
    /// Client backoff advisory.
    pub const BACKOFF: &str = "Backoff";
    /// Retry advisory, same name on both sides.
    pub const RETRY_AFTER: &str = "Retry-After";

    /// Upstream precondition: fail unless unmodified since.
    pub const X_IF_UNMODIFIED_SINCE: &str = "X-If-Unmodified-Since";
    /// Upstream precondition: not-modified unless modified since.
    pub const X_IF_MODIFIED_SINCE: &str = "X-If-Modified-Since";
    /// Upstream modification timestamp (seconds).
    pub const X_LAST_MODIFIED: &str = "X-Last-Modified";
    /// Upstream pagination cursor.
    pub const X_WEAVE_NEXT_OFFSET: &str = "X-Weave-Next-Offset";
    /// Upstream record count.
    pub const X_WEAVE_RECORDS: &str = "X-Weave-Records";
    /// Upstream quota advisory.
    pub const X_WEAVE_QUOTA_REMAINING: &str = "X-Weave-Quota-Remaining";
    /// Upstream alert advisory.
    pub const X_WEAVE_ALERT: &str = "X-Weave-Alert";
    /// Upstream backoff advisory.
    pub const X_WEAVE_BACKOFF: &str = "X-Weave-Backoff";
    /// Upstream backoff advisory (newer spelling).
    pub const X_BACKOFF: &str = "X-Backoff";
}

/// Upstream advisory headers and the client names they are exported under.
const ADVISORIES: &[(&str, &str)] = &[
    (names::X_WEAVE_QUOTA_REMAINING, names::QUOTA_REMAINING),
    (names::X_WEAVE_ALERT, names::ALERT),
    (names::X_WEAVE_BACKOFF, names::BACKOFF),
    (names::X_BACKOFF, names::BACKOFF),
    (names::RETRY_AFTER, names::RETRY_AFTER),
];

/// Conditional headers sent by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    /// Raw `If-Match` value.
    pub if_match: Option<String>,
    /// Raw `If-None-Match` value.
    pub if_none_match: Option<String>,
}

impl ConditionalHeaders {
    /// Creates an empty set of conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks the conditional headers out of a full request header set.
    pub fn from_headers(headers: &Headers) -> Self {
        Self {
            if_match: headers.get(names::IF_MATCH).map(str::to_string),
            if_none_match: headers.get(names::IF_NONE_MATCH).map(str::to_string),
        }
    }

    /// Sets `If-Match`.
    pub fn with_if_match(mut self, value: impl Into<String>) -> Self {
        self.if_match = Some(value.into());
        self
    }

    /// Sets `If-None-Match`.
    pub fn with_if_none_match(mut self, value: impl Into<String>) -> Self {
        self.if_none_match = Some(value.into());
        self
    }
}

/// A parsed ETag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Etag {
    Any,
    Millis(u64),
}

fn parse_etag(header: &str, raw: &str, allow_any: bool) -> ProtocolResult<Etag> {
    let value = raw.trim();
    if value == "*" {
        return if allow_any {
            Ok(Etag::Any)
        } else {
            Err(ProtocolError::invalid_header(header, "\"*\" is not allowed here"))
        };
    }

    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| {
            ProtocolError::invalid_header(
                header,
                "the value should be integer between double quotes",
            )
        })?;

    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::invalid_header(
            header,
            "the value should be integer between double quotes",
        ));
    }

    inner
        .parse::<u64>()
        .map(Etag::Millis)
        .map_err(|_| ProtocolError::invalid_header(header, "timestamp out of range"))
}

/// Formats milliseconds as upstream seconds with two decimals.
pub(crate) fn millis_to_upstream_seconds(millis: u64) -> String {
    format!("{:.2}", millis as f64 / 1000.0)
}

/// Translates client conditional headers into upstream preconditions.
///
/// - `If-Match: "<ms>"` becomes `X-If-Unmodified-Since: <ms/1000>`
/// - `If-None-Match: "*"` becomes `X-If-Unmodified-Since: 0` unless `If-Match` is set
/// - `If-None-Match: "<ms>"` becomes `X-If-Modified-Since: <ms/1000>`
pub fn import_conditional(conditions: &ConditionalHeaders) -> ProtocolResult<Headers> {
    let mut upstream = Headers::new();

    let if_match = conditions
        .if_match
        .as_deref()
        .map(|raw| parse_etag(names::IF_MATCH, raw, false))
        .transpose()?;
    let if_none_match = conditions
        .if_none_match
        .as_deref()
        .map(|raw| parse_etag(names::IF_NONE_MATCH, raw, true))
        .transpose()?;

    if let Some(Etag::Millis(ms)) = if_match {
        upstream = upstream.with(names::X_IF_UNMODIFIED_SINCE, millis_to_upstream_seconds(ms));
    }

    match if_none_match {
        Some(Etag::Any) if if_match.is_none() => {
            upstream = upstream.with(names::X_IF_UNMODIFIED_SINCE, "0");
        }
        Some(Etag::Millis(ms)) => {
            upstream = upstream.with(names::X_IF_MODIFIED_SINCE, millis_to_upstream_seconds(ms));
        }
        _ => {}
    }

    Ok(upstream)
}

/// What kind of client response the upstream headers belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// A single record.
    Record,
    /// A listing the client asked for in full.
    FullListing,
    /// A listing the client asked to paginate (`_limit` or `_token`).
    PagedListing,
}

/// Request-side facts needed to export response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContext {
    /// Kind of response.
    pub kind: ResponseKind,
    /// Full URL of the client request, used to build `Next-Page` links.
    pub request_url: Option<String>,
}

impl ResponseContext {
    /// Context for a single record response.
    pub fn record() -> Self {
        Self {
            kind: ResponseKind::Record,
            request_url: None,
        }
    }

    /// Context for a listing response.
    pub fn listing(paginated: bool) -> Self {
        Self {
            kind: if paginated {
                ResponseKind::PagedListing
            } else {
                ResponseKind::FullListing
            },
            request_url: None,
        }
    }

    /// Sets the request URL.
    pub fn with_request_url(mut self, url: impl Into<String>) -> Self {
        self.request_url = Some(url.into());
        self
    }
}

/// Copies upstream advisories under their client names, values verbatim.
pub fn export_advisories(upstream: &Headers) -> Headers {
    ADVISORIES
        .iter()
        .filter_map(|(from, to)| upstream.get(from).map(|value| (*to, value)))
        .collect()
}

/// Translates upstream response headers into client headers.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidHeader`] if `X-Last-Modified` is not a number.
pub fn export_response(upstream: &Headers, context: &ResponseContext) -> ProtocolResult<Headers> {
    let mut headers = Headers::new();

    if let Some(raw) = upstream.get(names::X_LAST_MODIFIED) {
        let seconds: f64 = raw
            .trim()
            .parse()
            .ok()
            .filter(|s: &f64| s.is_finite() && *s >= 0.0)
            .ok_or_else(|| {
                ProtocolError::invalid_header(names::X_LAST_MODIFIED, "not a timestamp")
            })?;

        headers = headers.with(names::ETAG, format!("\"{}\"", (seconds * 1000.0).round() as u64));
        if let Some(date) = http_date(seconds) {
            headers = headers.with(names::LAST_MODIFIED, date);
        }
    }

    let is_listing = context.kind != ResponseKind::Record;
    let next_offset = upstream.get(names::X_WEAVE_NEXT_OFFSET);

    if is_listing {
        if let Some(offset) = next_offset {
            let link = match &context.request_url {
                Some(url) => next_page_url(url, offset),
                None => offset.to_string(),
            };
            headers = headers.with(names::NEXT_PAGE, link);
        }
    }

    if context.kind == ResponseKind::FullListing && next_offset.is_none() {
        if let Some(total) = upstream.get(names::X_WEAVE_RECORDS) {
            headers = headers.with(names::TOTAL_RECORDS, total);
        }
    }

    Ok(headers.merged(&export_advisories(upstream)))
}

/// Formats whole seconds since epoch as an IMF-fixdate.
fn http_date(seconds: f64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(seconds.floor() as i64, 0)
        .map(|dt| dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Rebuilds `url` with its `_token` parameter set to `offset`.
///
/// Path-only URLs are resolved against a placeholder origin and rendered
/// back without it. Unparseable URLs yield the bare offset.
fn next_page_url(raw: &str, offset: &str) -> String {
    let (mut url, relative) = match Url::parse(raw) {
        Ok(url) => (url, false),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            match Url::parse(RELATIVE_BASE).and_then(|base| base.join(raw)) {
                Ok(url) => (url, true),
                Err(e) => return bare_offset(raw, offset, e),
            }
        }
        Err(e) => return bare_offset(raw, offset, e),
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != "_token")
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("_token", offset);

    if relative {
        url[Position::BeforePath..].to_string()
    } else {
        url.into()
    }
}

const RELATIVE_BASE: &str = "http://relative.invalid";

fn bare_offset(raw: &str, offset: &str, error: url::ParseError) -> String {
    tracing::debug!(url = raw, %error, "request URL not parseable, linking bare offset");
    offset.to_string()
}
