//! Backend Module
//!
//! The primitive store contract every physical cache is adapted to, plus the
//! in-process implementations shipped with the crate.
//!
//! # Backends
//! - [`MemoryStore`]: plain map for tests and fronting, counters synthesized
//! - [`SharedMemoryStore`]: process-shared table with native atomic counters
//! - [`KvStore`]: key-value store with atomic command pipelines

mod kv;
mod memory;
mod shared;

use std::collections::HashMap;

use crate::cache::Expiration;
use crate::error::{CacheError, Result};

pub use kv::KvStore;
pub use memory::MemoryStore;
pub use shared::SharedMemoryStore;

// == Pipeline Commands ==
/// One command in a pipelined batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `value` only if `key` is absent. Replies `Bool`.
    AddIfAbsent {
        key: String,
        value: Vec<u8>,
        ttl: Expiration,
    },
    /// Add `delta` to the integer at `key`, treating a missing key as 0. Replies `Int`.
    IncrBy { key: String, delta: i64 },
    /// Reset the expiry of `key`. Replies `Bool` (false when the key is missing).
    Expire { key: String, ttl: Expiration },
    /// Overwrite a negative integer at `key` with 0. Replies `Int` with the final value.
    ClampAtZero { key: String },
}

/// Reply to one pipelined command, in submission order.
#[derive(Debug)]
pub enum Reply {
    Bool(bool),
    Int(i64),
    Error(CacheError),
}

// == Backend Trait ==
/// Primitive operations of a physical cache.
///
/// Keys are already mapped and values already encoded when they reach a
/// backend. All methods take `&self`; implementations use interior mutability.
/// `flush` clears the whole store, regardless of any key namespace.
pub trait Backend: Send + Sync {
    /// Backend name used to tag metrics and log events.
    fn name(&self) -> &str;

    /// Stores `value` only if `key` is absent.
    fn add(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool>;

    /// Stores `value` unconditionally.
    fn set(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool>;

    /// Stores `value` only if `key` exists.
    fn replace(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Fetches several keys in one call, omitting absent ones.
    ///
    /// A failing batch is an `Err`, never a partially filled map.
    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>>;

    /// Removes `key`, returning whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    fn flush(&self) -> Result<bool>;

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Resets the expiry of an existing key.
    fn expire(&self, key: &str, ttl: Expiration) -> Result<bool>;

    /// Native counter increment on an existing key, returning the new value.
    ///
    /// A missing key is set to `initial`. A non-numeric value is
    /// [`CacheError::TypeMismatch`] and is left untouched.
    fn increment(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        let _ = (offset, initial, ttl);
        Err(CacheError::Unsupported(format!(
            "{} has no native increment (key {key})",
            self.name()
        )))
    }

    /// Native counter decrement, clamped at zero. Same contract as `increment`.
    fn decrement(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        let _ = (offset, initial, ttl);
        Err(CacheError::Unsupported(format!(
            "{} has no native decrement (key {key})",
            self.name()
        )))
    }

    /// Whether `increment`/`decrement` are implemented.
    fn supports_counters(&self) -> bool {
        false
    }

    /// Whether `execute` submits command batches in one round trip.
    fn supports_pipelining(&self) -> bool {
        false
    }

    /// Executes a command batch atomically, one reply per command.
    ///
    /// The batch stops at the first `Reply::Error`: later commands are not
    /// run and reply with [`CacheError::Pipeline`]. `Err` means the batch as a
    /// whole was not executed.
    fn execute(&self, commands: &[Command]) -> Result<Vec<Reply>> {
        Err(CacheError::Unsupported(format!(
            "{} does not pipeline ({} commands)",
            self.name(),
            commands.len()
        )))
    }
}

impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn add(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        (**self).add(key, value, ttl)
    }
    fn set(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        (**self).set(key, value, ttl)
    }
    fn replace(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        (**self).replace(key, value, ttl)
    }
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }
    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        (**self).get_many(keys)
    }
    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
    fn flush(&self) -> Result<bool> {
        (**self).flush()
    }
    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
    fn expire(&self, key: &str, ttl: Expiration) -> Result<bool> {
        (**self).expire(key, ttl)
    }
    fn increment(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        (**self).increment(key, offset, initial, ttl)
    }
    fn decrement(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        (**self).decrement(key, offset, initial, ttl)
    }
    fn supports_counters(&self) -> bool {
        (**self).supports_counters()
    }
    fn supports_pipelining(&self) -> bool {
        (**self).supports_pipelining()
    }
    fn execute(&self, commands: &[Command]) -> Result<Vec<Reply>> {
        (**self).execute(commands)
    }
}

// == Expiring ==
/// Stores holding real-time expiring entries that can be purged in bulk.
pub trait Expiring: Send + Sync {
    /// Removes every expired entry, returning how many were removed.
    fn cleanup_expired(&self) -> usize;
}

// == Counter Encoding ==
/// Encodes a counter in the native decimal form.
pub fn encode_counter(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Parses a stored payload as a native decimal counter.
pub fn parse_counter(key: &str, payload: &[u8]) -> Result<i64> {
    std::str::from_utf8(payload)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| CacheError::TypeMismatch(format!("value at {key} is not an integer")))
}
