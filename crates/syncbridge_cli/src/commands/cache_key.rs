//! Cache-key command implementation.

use super::bare_assertion;
use syncbridge_auth::CACHE_KEY_PREFIX;
use syncbridge_crypto::hmac_digest;

/// Cache key under which the gateway stores credentials for `input`.
pub fn cache_key(input: &str, secret: &[u8]) -> Result<String, Box<dyn std::error::Error>> {
    let digest = hmac_digest(secret, bare_assertion(input))?;
    Ok(format!("{CACHE_KEY_PREFIX}{digest}"))
}

/// Runs the cache-key command.
pub fn run(input: &str, secret: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    if secret.is_empty() {
        return Err("Server secret must not be empty".into());
    }
    tracing::debug!(prefix = CACHE_KEY_PREFIX, "computing cache key");
    println!("{}", cache_key(input, secret)?);
    Ok(())
}
