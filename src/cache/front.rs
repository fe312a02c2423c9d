//! In-Memory Front Module
//!
//! Wraps any [`Cache`] with a bounded, process-local shadow of recently
//! written and read values. Reads are answered from the shadow when possible;
//! writes go to the wrapped cache first and are shadowed only on success.
//!
//! Eviction is FIFO by first insertion: reads and overwrites never move a key.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use tracing::trace;

use crate::cache::{Cache, CounterStep, FifoTracker, FrontStats, Value};
use crate::config::CacheConfig;
use crate::error::Result;

/// Default shadow capacity.
pub const DEFAULT_MAX_LOCAL_ENTRIES: usize = 100;

#[derive(Debug, Default)]
struct Shadow {
    entries: HashMap<String, Value>,
    order: FifoTracker,
    hits: u64,
    misses: u64,
    evictions: u64,
    batch_fetches: u64,
}

impl Shadow {
    fn lookup(&mut self, key: &str) -> Option<Value> {
        let found = self.entries.get(key).cloned();
        match found {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        found
    }

    fn put(&mut self, key: &str, value: Value) {
        if self.entries.insert(key.to_string(), value).is_none() {
            self.order.insert(key);
        }
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Evicts oldest insertions until at most `max_size` entries remain.
    fn enforce(&mut self, max_size: usize) {
        while self.entries.len() > max_size {
            let Some(oldest) = self.order.evict_oldest() else {
                break;
            };
            self.entries.remove(&oldest);
            self.evictions += 1;
            trace!(key = %oldest, "evicted from front");
        }
    }
}

// == In-Memory Front ==
/// A [`Cache`] layered over another cache with a bounded local shadow.
///
/// The shadow assumes single-owner access: writes made to the wrapped cache
/// by anyone else are not seen until the shadowed entry is evicted.
#[derive(Debug)]
pub struct InMemoryFront<C> {
    inner: C,
    max_size: usize,
    shadow: Mutex<Shadow>,
}

impl<C: Cache> InMemoryFront<C> {
    // == Constructors ==
    /// Fronts `inner` with a shadow holding at most `max_size` entries.
    pub fn new(inner: C, max_size: usize) -> Self {
        Self {
            inner,
            max_size,
            shadow: Mutex::new(Shadow::default()),
        }
    }

    pub fn from_config(inner: C, config: &CacheConfig) -> Self {
        Self::new(inner, config.max_local_entries)
    }

    // == Accessors ==
    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of shadowed entries.
    pub fn len(&self) -> usize {
        self.shadow.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is currently shadowed.
    pub fn contains_local(&self, key: &str) -> bool {
        self.shadow.lock().entries.contains_key(key)
    }

    /// Shadowed keys from oldest to newest insertion.
    pub fn local_keys(&self) -> Vec<String> {
        self.shadow.lock().order.iter().map(str::to_string).collect()
    }

    // == Stats ==
    pub fn stats(&self) -> FrontStats {
        let shadow = self.shadow.lock();
        FrontStats {
            hits: shadow.hits,
            misses: shadow.misses,
            evictions: shadow.evictions,
            batch_fetches: shadow.batch_fetches,
            total_entries: shadow.entries.len(),
            capacity: self.max_size,
        }
    }

    fn remember(&self, key: &str, value: Value) {
        let mut shadow = self.shadow.lock();
        shadow.put(key, value);
        shadow.enforce(self.max_size);
    }

    /// Reads one key from the wrapped cache and shadows it when found.
    fn fetch_through(&self, key: &str) -> Result<Option<Value>> {
        let fetched = self.inner.get(key)?;
        if let Some(value) = &fetched {
            self.remember(key, value.clone());
        }
        Ok(fetched)
    }
}

impl<C: Cache> Cache for InMemoryFront<C> {
    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let added = self.inner.add(key, value, ttl)?;
        if added {
            self.remember(key, value.clone());
        }
        Ok(added)
    }

    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let stored = self.inner.set(key, value, ttl)?;
        if stored {
            self.remember(key, value.clone());
        }
        Ok(stored)
    }

    fn replace(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let replaced = self.inner.replace(key, value, ttl)?;
        if replaced {
            self.remember(key, value.clone());
        }
        Ok(replaced)
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let local = self.shadow.lock().lookup(key);
        match local {
            Some(value) => Ok(Some(value)),
            None => self.fetch_through(key),
        }
    }

    fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let mut found = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();
        {
            let mut shadow = self.shadow.lock();
            let mut seen = HashSet::with_capacity(keys.len());
            for key in keys.iter().copied() {
                if !seen.insert(key) {
                    continue;
                }
                match shadow.lookup(key) {
                    Some(value) => {
                        found.insert(key.to_string(), value);
                    }
                    None => missing.push(key),
                }
            }
        }

        match missing.as_slice() {
            [] => {}
            [key] => {
                if let Some(value) = self.fetch_through(key)? {
                    found.insert(key.to_string(), value);
                }
            }
            _ => {
                let fetched = self.inner.get_many(&missing)?;
                let mut shadow = self.shadow.lock();
                shadow.batch_fetches += 1;
                for (key, value) in &fetched {
                    shadow.put(key, value.clone());
                }
                shadow.enforce(self.max_size);
                drop(shadow);
                found.extend(fetched);
            }
        }
        Ok(found)
    }

    /// Removes `key` from the wrapped cache and the shadow.
    ///
    /// The shadowed copy is dropped whenever the wrapped cache answered, even
    /// with `false`: either way the key is no longer there.
    fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.inner.delete(key)?;
        self.shadow.lock().remove(key);
        Ok(removed)
    }

    fn flush(&self) -> Result<bool> {
        let flushed = self.inner.flush()?;
        if flushed {
            self.shadow.lock().clear();
        }
        Ok(flushed)
    }

    fn apply_counter(&self, key: &str, step: CounterStep) -> Result<Option<u64>> {
        let value = self.inner.apply_counter(key, step)?;
        if let Some(current) = value {
            self.remember(key, Value::from(current));
        }
        Ok(value)
    }
}
