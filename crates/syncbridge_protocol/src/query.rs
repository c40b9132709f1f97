//! Collection listing querystring translation.

use crate::error::{ProtocolError, ProtocolResult};
use crate::headers::millis_to_upstream_seconds;
use syncbridge_codec::uuid4_to_base64;

const SORT_DESCRIPTION: &str =
    "_sort should be one of ('-last_modified', 'newest', '-sortindex', 'index')";
const IDS_DESCRIPTION: &str = "Invalid id in ids list.";

/// Upstream listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently modified first.
    Newest,
    /// By sort index.
    Index,
}

impl SortOrder {
    fn parse(value: &str) -> ProtocolResult<Self> {
        match value {
            "-last_modified" | "newest" => Ok(Self::Newest),
            "-sortindex" | "index" => Ok(Self::Index),
            _ => Err(ProtocolError::invalid_parameter("_sort", SORT_DESCRIPTION)),
        }
    }

    /// Upstream parameter value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Index => "index",
        }
    }
}

/// A validated client listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    /// `_since`, milliseconds.
    pub since: Option<u64>,
    /// `_limit`.
    pub limit: Option<u64>,
    /// `_token`, an opaque upstream offset.
    pub token: Option<String>,
    /// `_sort`.
    pub sort: Option<SortOrder>,
    /// `ids`, already converted to sync record ids.
    pub ids: Option<Vec<String>>,
}

fn parse_integer(name: &str, value: &str) -> ProtocolResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ProtocolError::invalid_parameter(name, format!("{name} should be an integer")))
}

impl CollectionQuery {
    /// Creates an empty query (full listing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses querystring pairs. Unknown parameters are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidParameter`] naming the first bad parameter.
    pub fn from_params<I, K, V>(params: I) -> ProtocolResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::new();
        for (name, value) in params {
            let value = value.as_ref();
            match name.as_ref() {
                "_since" => query.since = Some(parse_integer("_since", value)?),
                "_limit" => query.limit = Some(parse_integer("_limit", value)?),
                "_token" => query.token = Some(value.to_string()),
                "_sort" => query.sort = Some(SortOrder::parse(value)?),
                "ids" => query.ids = Some(parse_ids(value)?),
                _ => {}
            }
        }
        Ok(query)
    }

    /// True if the client asked for one page rather than the whole listing.
    pub fn is_paginated(&self) -> bool {
        self.limit.is_some() || self.token.is_some()
    }

    /// Builds the upstream query. Listings always ask for full records.
    pub fn to_upstream(&self) -> UpstreamQuery {
        UpstreamQuery {
            full: true,
            newer: self.since.map(millis_to_upstream_seconds),
            limit: self.limit,
            offset: self.token.clone(),
            sort: self.sort,
            ids: self.ids.clone(),
        }
    }
}

fn parse_ids(value: &str) -> ProtocolResult<Vec<String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            uuid4_to_base64(id).map_err(|_| ProtocolError::invalid_parameter("ids", IDS_DESCRIPTION))
        })
        .collect()
}

/// Querystring sent to the backend's collection listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamQuery {
    /// Return full records instead of ids.
    pub full: bool,
    /// Only records newer than this many seconds.
    pub newer: Option<String>,
    /// Page size.
    pub limit: Option<u64>,
    /// Continuation offset.
    pub offset: Option<String>,
    /// Order.
    pub sort: Option<SortOrder>,
    /// Restrict to these sync record ids.
    pub ids: Option<Vec<String>>,
}

impl UpstreamQuery {
    /// Renders the query as name/value pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.full {
            pairs.push(("full", "1".to_string()));
        }
        if let Some(newer) = &self.newer {
            pairs.push(("newer", newer.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = &self.offset {
            pairs.push(("offset", offset.clone()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(ids) = &self.ids {
            pairs.push(("ids", ids.join(",")));
        }
        pairs
    }
}
