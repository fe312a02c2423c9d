//! Cache Layer Contract
//!
//! The one set of operations every cache layer offers, whether it talks to a
//! backend directly ([`CacheClient`](crate::cache::CacheClient)) or fronts
//! another layer ([`InMemoryFront`](crate::cache::InMemoryFront)). Callers
//! code against [`Cache`] and can stack layers freely.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{CounterStep, Value};
use crate::error::Result;

// == Cache Trait ==
/// Uniform cache operations on logical keys.
///
/// `ttl` is in seconds: `None` uses the layer's default expiration and
/// `Some(0)` never expires. Declined operations are `Ok(false)` or `Ok(None)`;
/// `Err` is reserved for broken ones.
pub trait Cache: Send + Sync {
    /// Stores `value` only if `key` is absent.
    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool>;

    /// Stores `value` unconditionally.
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool>;

    /// Stores `value` only if `key` already exists.
    fn replace(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool>;

    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Fetches several keys, keyed by logical name. Absent keys are omitted.
    fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>>;

    fn delete(&self, key: &str) -> Result<bool>;

    /// Clears the whole backing store, not just this layer's namespace.
    fn flush(&self) -> Result<bool>;

    /// Applies one counter step and reports the counter's new value.
    ///
    /// `Ok(None)` means the stored value is not an integer.
    fn apply_counter(&self, key: &str, step: CounterStep) -> Result<Option<u64>>;

    /// Adds `offset` to the counter at `key`, creating it at `initial`.
    ///
    /// A counter created by this call holds exactly `initial`.
    fn increment(&self, key: &str, offset: i64, initial: i64, ttl: Option<u64>) -> Result<bool> {
        let step = CounterStep {
            ttl,
            ..CounterStep::increment(offset).initial(initial)
        };
        Ok(self.apply_counter(key, step)?.is_some())
    }

    /// Subtracts `offset` from the counter at `key`, never going below zero.
    fn decrement(&self, key: &str, offset: i64, initial: i64, ttl: Option<u64>) -> Result<bool> {
        let step = CounterStep {
            ttl,
            ..CounterStep::decrement(offset).initial(initial)
        };
        Ok(self.apply_counter(key, step)?.is_some())
    }
}

impl<C: Cache + ?Sized> Cache for &C {
    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        (**self).add(key, value, ttl)
    }
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        (**self).set(key, value, ttl)
    }
    fn replace(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        (**self).replace(key, value, ttl)
    }
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }
    fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        (**self).get_many(keys)
    }
    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
    fn flush(&self) -> Result<bool> {
        (**self).flush()
    }
    fn apply_counter(&self, key: &str, step: CounterStep) -> Result<Option<u64>> {
        (**self).apply_counter(key, step)
    }
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        (**self).add(key, value, ttl)
    }
    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        (**self).set(key, value, ttl)
    }
    fn replace(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        (**self).replace(key, value, ttl)
    }
    fn get(&self, key: &str) -> Result<Option<Value>> {
        (**self).get(key)
    }
    fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        (**self).get_many(keys)
    }
    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
    fn flush(&self) -> Result<bool> {
        (**self).flush()
    }
    fn apply_counter(&self, key: &str, step: CounterStep) -> Result<Option<u64>> {
        (**self).apply_counter(key, step)
    }
}
