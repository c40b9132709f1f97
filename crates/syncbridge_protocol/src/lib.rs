//! # SyncBridge Protocol
//!
//! Translation between the document protocol spoken by clients and the
//! timestamp-based sync protocol spoken by the backend.
//!
//! This crate provides:
//! - [`Headers`], an immutable header set value
//! - Conditional header import (`If-Match`/`If-None-Match` to timestamps)
//! - Response header export (ETag, pagination, advisories)
//! - The upstream error dispatch table ([`ErrorTranslator`])
//! - Collection query and record body translation
//!
//! This is a pure translation crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod error;
mod errors;
mod header_set;
mod headers;
mod query;
mod record;

pub use error::{ProtocolError, ProtocolResult};
pub use errors::{
    ClientError, Errno, ErrorBody, ErrorTranslator, FailureKind, UpstreamError, UpstreamFailure,
    DEFAULT_RETRY_AFTER_SECS,
};
pub use header_set::Headers;
pub use headers::{
    export_advisories, export_response, import_conditional, names, ConditionalHeaders,
    ResponseContext, ResponseKind,
};
pub use query::{CollectionQuery, SortOrder, UpstreamQuery};
pub use record::{record_to_client, record_to_upstream, records_to_client};
