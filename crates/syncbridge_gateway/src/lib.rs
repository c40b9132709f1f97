//! # SyncBridge Gateway
//!
//! Serves a document-oriented REST protocol (ETags, UUID record ids,
//! `{"data": ...}` envelopes) from a timestamp-based sync backend.
//!
//! The gateway owns no state of its own. Collaborators are injected:
//! - a [`CredentialResolver`](syncbridge_auth::CredentialResolver) with its cache and token server
//! - a [`SyncStorage`] for the collection and record calls
//!
//! Routing, schema validation and CORS are left to the embedding server.
//!
//! ## Example
//!
//! ```rust,ignore
//! let gateway = Gateway::new(resolver, storage, GatewayConfig::default());
//! let request = GatewayRequest::new()
//!     .with_header("Authorization", "BrowserID <assertion>")
//!     .with_header("X-Client-State", client_state)
//!     .with_param("_limit", "10");
//! let response = match gateway.list_records(&request, "tabs").await {
//!     Ok(response) => response,
//!     Err(err) => ClientResponse::from(err),
//! };
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod gateway;
mod request;
mod storage;

pub use config::GatewayConfig;
pub use gateway::{Gateway, GatewayResult};
pub use request::{ClientResponse, GatewayRequest};
pub use storage::{SyncStorage, UpstreamResponse};
