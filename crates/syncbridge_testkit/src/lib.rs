//! # SyncBridge Testkit
//!
//! Test utilities for SyncBridge.
//!
//! This crate provides:
//! - In-memory doubles for the token server and the sync backend
//! - Assertion builders and a wired-up gateway harness
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use syncbridge_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn lists_records() {
//!     let harness = GatewayHarness::new();
//!     harness.storage.insert("tabs", "Xzk1aVBHdVk1", serde_json::json!({"payload": "x"}));
//!     let response = harness.gateway.list_records(&harness.request(), "tabs").await.unwrap();
//!     assert_eq!(response.status, 200);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod doubles;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::doubles::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use doubles::*;
pub use fixtures::*;
pub use generators::*;
