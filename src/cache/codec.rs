//! Value Codec Module
//!
//! Hook pair applied to every value on its way to and from a backend.
//! For each codec `decode(encode(v)) == v`.

use std::fmt;
use std::io::{Read, Write};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::Rng;
use tracing::trace;

use crate::cache::Value;
use crate::error::{CacheError, Result};

const NONCE_LEN: usize = 12;

// == Value Codec Trait ==
/// Transforms values before storage and reverses the transform on retrieval.
pub trait ValueCodec: Send + Sync + fmt::Debug {
    /// Short name used in log events.
    fn name(&self) -> &'static str;

    /// Maps a value to the payload handed to the backend.
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    /// Maps a backend payload back to the original value.
    fn decode(&self, payload: &[u8]) -> Result<Value>;

    /// Whether counters (stored in the backend's native decimal form) can be
    /// read back through this codec.
    fn supports_counters(&self) -> bool {
        true
    }
}

// == Plain ==
/// Identity transform over the value's plain JSON encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl ValueCodec for PlainCodec {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, payload: &[u8]) -> Result<Value> {
        Ok(serde_json::from_slice(payload)?)
    }
}

// == Compressed ==
/// Serializes then gzip-compresses values.
///
/// Payloads that fail to decompress are read as plain JSON, so data written
/// before compression was enabled stays readable.
#[derive(Debug, Clone, Copy)]
pub struct CompressedCodec {
    level: Compression,
}

impl CompressedCodec {
    /// Creates a codec with the given compression level (0-9).
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for CompressedCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl ValueCodec for CompressedCodec {
    fn name(&self) -> &'static str {
        "compressed"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let json = serde_json::to_vec(value)?;
        let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), self.level);
        encoder
            .write_all(&json)
            .map_err(|e| CacheError::Codec(e.to_string()))?;
        encoder.finish().map_err(|e| CacheError::Codec(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Value> {
        let mut decoder = GzDecoder::new(payload);
        let mut inflated = Vec::new();
        match decoder.read_to_end(&mut inflated) {
            Ok(_) => Ok(serde_json::from_slice(&inflated)?),
            Err(e) => {
                trace!(error = %e, "payload is not compressed, reading it raw");
                Ok(serde_json::from_slice(payload)?)
            }
        }
    }
}

// == Encrypted ==
/// Encrypts values with AES-256-GCM under one static key.
///
/// Payload layout is `nonce (12 bytes) || ciphertext`. The cipher is
/// authenticated: a payload written under another key, or tampered with,
/// fails to decode with [`CacheError::Codec`] instead of yielding garbage.
/// Counters bypass codecs, so this codec refuses them.
#[derive(Clone)]
pub struct EncryptedCodec {
    cipher: Aes256Gcm,
}

impl EncryptedCodec {
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    /// Creates a codec from a key slice, which must be exactly 32 bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let key: [u8; 32] = key.try_into().map_err(|_| {
            CacheError::InvalidArgument(format!(
                "Encryption key must be 32 bytes, got {}",
                key.len()
            ))
        })?;
        Ok(Self::new(key))
    }
}

impl fmt::Debug for EncryptedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedCodec").finish_non_exhaustive()
    }
}

impl ValueCodec for EncryptedCodec {
    fn name(&self) -> &'static str {
        "encrypted"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let plaintext = serde_json::to_vec(value)?;
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
            .map_err(|e| CacheError::Codec(format!("encryption failed: {e}")))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(payload)
    }

    fn decode(&self, payload: &[u8]) -> Result<Value> {
        if payload.len() < NONCE_LEN {
            return Err(CacheError::Codec(
                "encrypted payload shorter than its nonce".to_string(),
            ));
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CacheError::Codec(format!("decryption failed: {e}")))?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    fn supports_counters(&self) -> bool {
        false
    }
}
