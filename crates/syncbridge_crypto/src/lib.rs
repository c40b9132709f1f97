//! # SyncBridge Crypto
//!
//! Cryptographic primitives backing the SyncBridge credential cache.
//!
//! ## Security Model
//!
//! - Cache keys are derived with HKDF-SHA256: the server secret is the
//!   extraction salt, the client-state token is the input keying material
//! - Neither input alone is enough to derive a key
//! - Values are sealed with AES-256-GCM under a fresh random nonce
//! - Sealed values are laid out as `nonce || tag || ciphertext` and hex-encoded
//! - Decryption fails closed: tampering or a wrong key pair is an error
//! - Keys are zeroized on drop
//!
//! ## Usage
//!
//! ```
//! use syncbridge_crypto::{decrypt, encrypt};
//!
//! let sealed = encrypt("{\"id\":\"abc\"}", "client-state", b"server secret").unwrap();
//! let opened = decrypt(&sealed, "client-state", b"server secret").unwrap();
//! assert_eq!(opened, "{\"id\":\"abc\"}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod cipher;
mod digest;
mod error;

pub use cipher::{decrypt, encrypt, CacheCipher, CacheKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use digest::hmac_digest;
pub use error::{CryptoError, CryptoResult};
