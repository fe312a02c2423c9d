//! Cache Entry Module
//!
//! Defines the structure for individual stored entries with expiration support.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::Expiration;

// == Cache Entry ==
/// A single stored entry: raw payload plus expiry metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Vec<u8>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped at `now_ms`.
    pub fn new(value: Vec<u8>, expiration: Expiration, now_ms: u64) -> Self {
        Self {
            value,
            created_at: now_ms,
            expires_at: deadline(expiration, now_ms),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is expired once `now_ms` reaches the expiration time.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    /// Resets the expiry relative to `now_ms`.
    pub fn expire(&mut self, expiration: Expiration, now_ms: u64) {
        self.expires_at = deadline(expiration, now_ms);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds at `now_ms`, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now_ms))
    }
}

fn deadline(expiration: Expiration, now_ms: u64) -> Option<u64> {
    expiration
        .as_secs()
        .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000)))
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
