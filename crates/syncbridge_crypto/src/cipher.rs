//! Cache value encryption using HKDF-derived AES-256-GCM keys.

use crate::error::{CryptoError, CryptoResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Symmetric key protecting one tenant's cached credentials.
///
/// The key is automatically zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CacheKey {
    bytes: [u8; KEY_SIZE],
}

impl CacheKey {
    /// Derives the cache key for a client-state token.
    ///
    /// HKDF-SHA256 extract-then-expand with `server_secret` as the salt,
    /// `client_state` as the input keying material and no context info.
    /// The result is deterministic for a given pair.
    pub fn derive(client_state: &str, server_secret: &[u8]) -> CryptoResult<Self> {
        let hk = Hkdf::<Sha256>::new(Some(server_secret), client_state.as_bytes());

        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(&[], &mut bytes)
            .map_err(|_| CryptoError::key_derivation("HKDF expand failed"))?;

        Ok(Self { bytes })
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::invalid_key_size(bytes.len(), KEY_SIZE));
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Returns the raw key bytes. Never log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Seals and opens cache values with AES-256-GCM.
///
/// Sealed layout: `nonce (12 bytes) || tag (16 bytes) || ciphertext`.
pub struct CacheCipher {
    cipher: Aes256Gcm,
}

impl CacheCipher {
    /// Creates a cipher for the given key.
    #[must_use]
    pub fn new(key: &CacheKey) -> Self {
        let key_array = GenericArray::from_slice(key.as_bytes());
        Self {
            cipher: Aes256Gcm::new(key_array),
        }
    }

    /// Seals `plaintext` under a fresh random nonce.
    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(nonce, b"", &mut buffer)
            .map_err(|_| CryptoError::encryption_failed("encryption error"))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buffer.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&tag);
        sealed.extend(buffer);

        Ok(sealed)
    }

    /// Opens a value produced by [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns an error if the value is truncated, was tampered with, or was
    /// sealed under a different key.
    pub fn open(&self, sealed: &[u8]) -> CryptoResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::decryption_failed("ciphertext too short"));
        }

        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        let tag = Tag::from_slice(&sealed[NONCE_SIZE..NONCE_SIZE + TAG_SIZE]);
        let mut buffer = sealed[NONCE_SIZE + TAG_SIZE..].to_vec();

        self.cipher
            .decrypt_in_place_detached(nonce, b"", &mut buffer, tag)
            .map_err(|_| CryptoError::decryption_failed("authentication failed"))?;

        Ok(buffer)
    }
}

impl std::fmt::Debug for CacheCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCipher")
            .field("cipher", &"Aes256Gcm")
            .finish()
    }
}

/// Encrypts `message` for storage, keyed by `(client_state, server_secret)`.
///
/// Returns the sealed value as lowercase hex.
pub fn encrypt(message: &str, client_state: &str, server_secret: &[u8]) -> CryptoResult<String> {
    let key = CacheKey::derive(client_state, server_secret)?;
    let sealed = CacheCipher::new(&key).seal(message.as_bytes())?;
    Ok(hex::encode(sealed))
}

/// Decrypts a hex value produced by [`encrypt`].
///
/// # Errors
///
/// Fails if the value is not hex, does not authenticate under the derived key,
/// or does not decrypt to UTF-8. It never returns garbage or an empty string
/// in place of an error.
pub fn decrypt(encrypted: &str, client_state: &str, server_secret: &[u8]) -> CryptoResult<String> {
    let sealed = hex::decode(encrypted)
        .map_err(|e| CryptoError::invalid_encoding(format!("stored value is not hex: {e}")))?;

    let key = CacheKey::derive(client_state, server_secret)?;
    let plaintext = CacheCipher::new(&key).open(&sealed)?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::invalid_encoding("plaintext is not valid UTF-8"))
}
