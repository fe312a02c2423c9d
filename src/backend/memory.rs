//! Memory Store
//!
//! Plain in-memory backend used for tests and as the store behind a front.
//! Counters are synthesized from a read followed by a write, which is not
//! atomic: two concurrent increments of one key can lose an update.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::backend::{encode_counter, parse_counter, Backend};
use crate::cache::{EntryTable, Expiration};
use crate::error::{CacheError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    table: EntryTable,
    /// Expiration requested by the last write of each key
    expirations: HashMap<String, Expiration>,
}

#[derive(Debug)]
struct MemoryInner {
    name: String,
    state: Mutex<MemoryState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    available: AtomicBool,
}

// == Memory Store ==
/// In-memory test double with a simulated clock, call counters and an
/// availability switch. Clones share the same contents.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    /// Creates a store reporting `name` in metrics and logs.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                name: name.into(),
                state: Mutex::new(MemoryState::default()),
                calls: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Simulates the passage of time, dropping entries whose expiry has passed.
    pub fn time_passes(&self, seconds: u64) {
        let mut state = self.state();
        state.table.advance(seconds);
        state.table.cleanup_expired();
    }

    /// Makes every following call fail with `BackendUnavailable` (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Number of calls made to one operation, e.g. `"get_many"`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.inner.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub fn reset_call_counts(&self) {
        self.inner.calls.lock().clear();
    }

    /// Expiration requested by the last write of a live key.
    pub fn expiration_of(&self, key: &str) -> Option<Expiration> {
        let mut state = self.state();
        if !state.table.contains(key) {
            return None;
        }
        state.expirations.get(key).copied()
    }

    /// Copy of every live key and its raw payload.
    pub fn contents(&self) -> HashMap<String, Vec<u8>> {
        self.state().table.snapshot()
    }

    pub fn len(&self) -> usize {
        self.contents().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.state.lock()
    }

    fn begin(&self, operation: &'static str) -> Result<()> {
        *self.inner.calls.lock().entry(operation).or_insert(0) += 1;
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::BackendUnavailable(format!(
                "{} is unreachable ({operation})",
                self.inner.name
            )))
        }
    }

    fn write(&self, key: &str, value: &[u8], ttl: Expiration) {
        let mut state = self.state();
        state.table.insert(key, value.to_vec(), ttl);
        state.expirations.insert(key.to_string(), ttl);
    }

    /// Read, adjust and write back a counter in two separate steps.
    fn synthesize_counter(&self, key: &str, delta: i64, initial: u64, ttl: Expiration) -> Result<u64> {
        let current = self.state().table.get(key).map(|entry| entry.value.clone());
        let next = match current {
            None => i64::try_from(initial).map_err(|_| {
                CacheError::InvalidArgument(format!("initial value {initial} out of range"))
            })?,
            Some(payload) => parse_counter(key, &payload)?.saturating_add(delta).max(0),
        };
        self.write(key, &encode_counter(next), ttl);
        Ok(next as u64)
    }
}

fn signed(offset: u64) -> Result<i64> {
    i64::try_from(offset)
        .map_err(|_| CacheError::InvalidArgument(format!("offset {offset} out of range")))
}

impl Backend for MemoryStore {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn add(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.begin("add")?;
        let mut state = self.state();
        if !state.table.insert_if_absent(key, value.to_vec(), ttl) {
            return Ok(false);
        }
        state.expirations.insert(key.to_string(), ttl);
        Ok(true)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.begin("set")?;
        self.write(key, value, ttl);
        Ok(true)
    }

    fn replace(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.begin("replace")?;
        let mut state = self.state();
        if !state.table.replace_existing(key, value.to_vec(), ttl) {
            return Ok(false);
        }
        state.expirations.insert(key.to_string(), ttl);
        Ok(true)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.begin("get")?;
        Ok(self.state().table.get(key).map(|entry| entry.value.clone()))
    }

    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.begin("get_many")?;
        let mut state = self.state();
        Ok(keys
            .iter()
            .filter_map(|key| {
                state
                    .table
                    .get(key)
                    .map(|entry| (key.clone(), entry.value.clone()))
            })
            .collect())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.begin("delete")?;
        let mut state = self.state();
        state.expirations.remove(key);
        Ok(state.table.remove(key))
    }

    fn flush(&self) -> Result<bool> {
        self.begin("flush")?;
        let mut state = self.state();
        state.table.clear();
        state.expirations.clear();
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.begin("exists")?;
        Ok(self.state().table.contains(key))
    }

    fn expire(&self, key: &str, ttl: Expiration) -> Result<bool> {
        self.begin("expire")?;
        let mut state = self.state();
        if !state.table.expire(key, ttl) {
            return Ok(false);
        }
        state.expirations.insert(key.to_string(), ttl);
        Ok(true)
    }

    fn supports_counters(&self) -> bool {
        true
    }

    fn increment(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        self.begin("increment")?;
        self.synthesize_counter(key, signed(offset)?, initial, ttl)
    }

    fn decrement(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        self.begin("decrement")?;
        self.synthesize_counter(key, -signed(offset)?, initial, ttl)
    }
}
