//! Shared Memory Store
//!
//! Process-wide in-memory cache: every clone of a store is a handle onto the
//! same locked table, so independent clients in one process see one cache.
//! Counter operations run under the table lock and are atomic.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{encode_counter, parse_counter, Backend, Expiring};
use crate::cache::{EntryTable, Expiration};
use crate::error::{CacheError, Result};

// == Shared Memory Store ==
#[derive(Debug, Clone, Default)]
pub struct SharedMemoryStore {
    table: Arc<Mutex<EntryTable>>,
}

impl SharedMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of a key in milliseconds: `Some(None)` never expires.
    pub fn ttl_remaining_ms(&self, key: &str) -> Option<Option<u64>> {
        self.table.lock().ttl_remaining_ms(key)
    }

    fn apply_delta(&self, key: &str, delta: i64, initial: u64, ttl: Expiration) -> Result<u64> {
        let mut table = self.table.lock();
        if let Some(entry) = table.get_mut(key) {
            let next = parse_counter(key, &entry.value)?
                .saturating_add(delta)
                .max(0);
            entry.value = encode_counter(next);
            return Ok(next as u64);
        }
        let initial = i64::try_from(initial).map_err(|_| {
            CacheError::InvalidArgument(format!("initial value {initial} out of range"))
        })?;
        table.insert(key, encode_counter(initial), ttl);
        Ok(initial as u64)
    }
}

fn signed(offset: u64) -> Result<i64> {
    i64::try_from(offset)
        .map_err(|_| CacheError::InvalidArgument(format!("offset {offset} out of range")))
}

impl Backend for SharedMemoryStore {
    fn name(&self) -> &str {
        "shared"
    }

    fn add(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        Ok(self.table.lock().insert_if_absent(key, value.to_vec(), ttl))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.table.lock().insert(key, value.to_vec(), ttl);
        Ok(true)
    }

    fn replace(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        Ok(self.table.lock().replace_existing(key, value.to_vec(), ttl))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.table.lock().get(key).map(|entry| entry.value.clone()))
    }

    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        let mut table = self.table.lock();
        Ok(keys
            .iter()
            .filter_map(|key| table.get(key).map(|entry| (key.clone(), entry.value.clone())))
            .collect())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.table.lock().remove(key))
    }

    fn flush(&self) -> Result<bool> {
        self.table.lock().clear();
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.table.lock().contains(key))
    }

    fn expire(&self, key: &str, ttl: Expiration) -> Result<bool> {
        Ok(self.table.lock().expire(key, ttl))
    }

    fn supports_counters(&self) -> bool {
        true
    }

    fn increment(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        self.apply_delta(key, signed(offset)?, initial, ttl)
    }

    fn decrement(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        self.apply_delta(key, -signed(offset)?, initial, ttl)
    }
}

impl Expiring for SharedMemoryStore {
    fn cleanup_expired(&self) -> usize {
        let removed = self.table.lock().cleanup_expired();
        if removed > 0 {
            debug!(removed, "shared store purged expired entries");
        }
        removed
    }
}
