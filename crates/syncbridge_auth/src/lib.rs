//! # SyncBridge Auth
//!
//! Resolution of client identity material into upstream sync credentials.
//!
//! A request carries an identity assertion (`Authorization: BrowserID ...`)
//! and a client-state token (`X-Client-State`). [`CredentialResolver`] turns
//! them into [`UpstreamCredentials`]:
//!
//! 1. The cache key is an HMAC of the assertion under the server secret
//! 2. On a hit the cached value is decrypted with a key derived from the
//!    client-state token and the server secret
//! 3. On a miss the assertion is exchanged at the token server and the
//!    result cached, encrypted, for at most the assertion's remaining lifetime
//!
//! A cached value that cannot be decrypted is an error, never a miss.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

pub mod assertion;
mod cache;
mod config;
mod credentials;
mod error;
mod resolver;
mod token_server;

pub use assertion::{
    parse_authorization, parse_client_state, ttl_from_assertion, AssertionClaims,
    ClaimTimestamp, AUTHORIZATION_HEADER, CLIENT_STATE_HEADER,
};
pub use cache::{CredentialCache, MemoryCache};
pub use config::{ResolverConfig, TokenServerConfig, DEFAULT_TOKEN_SERVER_URL};
pub use credentials::{TokenResponse, UpstreamCredentials};
pub use error::{AuthError, AuthResult};
pub use resolver::{CredentialResolver, CACHE_KEY_PREFIX};
pub use token_server::{HttpTokenServer, TokenServer};
