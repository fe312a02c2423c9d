//! Entry Table Module
//!
//! HashMap storage with expiration, shared by the in-process backends.

use std::collections::HashMap;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, Expiration};

// == Entry Table ==
/// Key to entry map that drops expired entries on access.
///
/// The table reads wall-clock time plus an adjustable offset, so test doubles
/// can simulate the passage of time without sleeping.
#[derive(Debug, Default)]
pub struct EntryTable {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Simulated time added to the wall clock
    clock_offset_ms: u64,
}

impl EntryTable {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Clock ==
    /// Current time as seen by this table (Unix milliseconds).
    pub fn now_ms(&self) -> u64 {
        current_timestamp_ms().saturating_add(self.clock_offset_ms)
    }

    /// Moves this table's clock forward.
    pub fn advance(&mut self, seconds: u64) {
        self.clock_offset_ms = self
            .clock_offset_ms
            .saturating_add(seconds.saturating_mul(1000));
    }

    // == Get ==
    /// Returns the live entry for `key`, removing it first if it has expired.
    pub fn get(&mut self, key: &str) -> Option<&CacheEntry> {
        self.purge_if_expired(key);
        self.entries.get(key)
    }

    /// Mutable access to the live entry for `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        self.purge_if_expired(key);
        self.entries.get_mut(key)
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // == Insert ==
    /// Stores `value` unconditionally, resetting its expiry.
    pub fn insert(&mut self, key: &str, value: Vec<u8>, ttl: Expiration) {
        let entry = CacheEntry::new(value, ttl, self.now_ms());
        self.entries.insert(key.to_string(), entry);
    }

    /// Stores `value` only if no live entry exists.
    pub fn insert_if_absent(&mut self, key: &str, value: Vec<u8>, ttl: Expiration) -> bool {
        if self.contains(key) {
            return false;
        }
        self.insert(key, value, ttl);
        true
    }

    /// Stores `value` only if a live entry exists.
    pub fn replace_existing(&mut self, key: &str, value: Vec<u8>, ttl: Expiration) -> bool {
        if !self.contains(key) {
            return false;
        }
        self.insert(key, value, ttl);
        true
    }

    /// Resets the expiry of a live entry.
    pub fn expire(&mut self, key: &str, ttl: Expiration) -> bool {
        let now = self.now_ms();
        match self.get_mut(key) {
            Some(entry) => {
                entry.expire(ttl, now);
                true
            }
            None => false,
        }
    }

    /// Remaining lifetime of a live entry: `Some(None)` never expires, `None` absent.
    pub fn ttl_remaining_ms(&mut self, key: &str) -> Option<Option<u64>> {
        let now = self.now_ms();
        self.get(key).map(|entry| entry.ttl_remaining_ms(now))
    }

    // == Delete ==
    /// Removes a live entry, returning whether one was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.purge_if_expired(key);
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the table.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    /// Copies every live entry's payload.
    pub fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        let now = self.now_ms();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Length ==
    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_if_expired(&mut self, key: &str) {
        let now = self.now_ms();
        if self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now))
        {
            self.entries.remove(key);
        }
    }
}
