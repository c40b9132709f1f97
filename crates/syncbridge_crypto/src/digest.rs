//! Keyed digests used to name cache entries.

use crate::error::{CryptoError, CryptoResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Returns `hex(HMAC-SHA256(secret, message))` in lowercase.
pub fn hmac_digest(secret: &[u8], message: &str) -> CryptoResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CryptoError::key_derivation(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
