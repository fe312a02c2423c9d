//! Cache Client Module
//!
//! Binds one backend to a key namespace, a value codec, a default expiration
//! and an optional metric sink, and implements the [`Cache`] contract on top.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::cache::{
    counter, Cache, CounterRegistry, CounterStep, Expiration, KeyMapper, MetricSink, PlainCodec,
    TracingSink, Value, ValueCodec,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Cache Client ==
/// A cache bound to one backend.
///
/// Every operation maps the logical key, resolves the expiration, records a
/// metric event when a sink is attached, and delegates to the backend. Counter
/// operations go through the initialization protocol in [`counter`].
pub struct CacheClient<B> {
    backend: B,
    keys: KeyMapper,
    codec: Arc<dyn ValueCodec>,
    metrics: Option<Arc<dyn MetricSink>>,
    default_expiration: u64,
    counters: CounterRegistry,
}

impl<B: Backend> CacheClient<B> {
    // == Constructors ==
    /// Creates a client with no namespace, plain values, no default expiry
    /// and no metrics.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            keys: KeyMapper::default(),
            codec: Arc::new(PlainCodec),
            metrics: None,
            default_expiration: 0,
            counters: CounterRegistry::new(),
        }
    }

    /// Creates a client configured from `config`.
    ///
    /// `metrics_enabled` attaches a [`TracingSink`]; use
    /// [`with_metrics`](Self::with_metrics) to inject a different sink.
    pub fn from_config(backend: B, config: &CacheConfig) -> Self {
        let mut client = Self::new(backend)
            .with_keys(KeyMapper::new(
                config.key_prefix.clone(),
                config.key_suffix.clone(),
            ))
            .with_default_expiration(config.default_expiration);
        if config.metrics_enabled {
            client.metrics = Some(Arc::new(TracingSink));
        }
        client
    }

    // == Builders ==
    pub fn with_keys(mut self, keys: KeyMapper) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.keys = KeyMapper::new(Some(prefix.into()), self.keys.suffix().map(str::to_string));
        self
    }

    pub fn with_codec(mut self, codec: impl ValueCodec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    pub fn with_metrics(mut self, sink: Arc<dyn MetricSink>) -> Self {
        self.metrics = Some(sink);
        self
    }

    /// Default expiration in seconds used when a call passes `None` (0 = never).
    pub fn with_default_expiration(mut self, seconds: u64) -> Self {
        self.default_expiration = seconds;
        self
    }

    // == Accessors ==
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn keys(&self) -> &KeyMapper {
        &self.keys
    }

    pub fn codec(&self) -> &dyn ValueCodec {
        self.codec.as_ref()
    }

    pub fn default_expiration(&self) -> u64 {
        self.default_expiration
    }

    /// Backend key for a logical key.
    pub fn map_key(&self, key: &str) -> String {
        self.keys.map(key)
    }

    /// Effective expiration of a call.
    pub fn map_expiration(&self, ttl: Option<u64>) -> Expiration {
        Expiration::resolve(ttl, self.default_expiration)
    }

    fn record(&self, operation: &str, mapped_key: &str) {
        if let Some(sink) = &self.metrics {
            sink.record_operation(self.backend.name(), operation, mapped_key);
        }
    }

    fn write(
        &self,
        operation: &str,
        key: &str,
        value: &Value,
        ttl: Option<u64>,
    ) -> Result<(String, Vec<u8>, Expiration)> {
        let mapped = self.map_key(key);
        self.record(operation, &mapped);
        let payload = self.codec.encode(value)?;
        Ok((mapped, payload, self.map_expiration(ttl)))
    }
}

impl<B: Backend> Cache for CacheClient<B> {
    fn add(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let (mapped, payload, ttl) = self.write("add", key, value, ttl)?;
        self.backend.add(&mapped, &payload, ttl)
    }

    fn set(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let (mapped, payload, ttl) = self.write("set", key, value, ttl)?;
        self.backend.set(&mapped, &payload, ttl)
    }

    fn replace(&self, key: &str, value: &Value, ttl: Option<u64>) -> Result<bool> {
        let (mapped, payload, ttl) = self.write("replace", key, value, ttl)?;
        self.backend.replace(&mapped, &payload, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mapped = self.map_key(key);
        self.record("get", &mapped);
        self.backend
            .get(&mapped)?
            .map(|payload| self.codec.decode(&payload))
            .transpose()
    }

    fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        let mut seen = HashSet::with_capacity(keys.len());
        let mut logical_of = HashMap::with_capacity(keys.len());
        let mut mapped_keys = Vec::with_capacity(keys.len());
        for key in keys {
            if seen.insert(*key) {
                let mapped = self.map_key(key);
                logical_of.insert(mapped.clone(), key.to_string());
                mapped_keys.push(mapped);
            }
        }
        if mapped_keys.is_empty() {
            return Ok(HashMap::new());
        }

        self.record("get_many", &mapped_keys.join(","));
        let fetched = self.backend.get_many(&mapped_keys)?;

        let mut found = HashMap::with_capacity(fetched.len());
        for (mapped, payload) in fetched {
            let Some(logical) = logical_of.remove(&mapped) else {
                warn!(key = %mapped, "backend returned an unrequested key");
                continue;
            };
            found.insert(logical, self.codec.decode(&payload)?);
        }
        Ok(found)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mapped = self.map_key(key);
        self.record("delete", &mapped);
        let removed = self.backend.delete(&mapped)?;
        self.counters.forget(&mapped);
        Ok(removed)
    }

    fn flush(&self) -> Result<bool> {
        self.record("flush", &self.keys.namespace());
        let flushed = self.backend.flush()?;
        self.counters.clear();
        info!(backend = self.backend.name(), "cache flushed");
        Ok(flushed)
    }

    fn apply_counter(&self, key: &str, step: CounterStep) -> Result<Option<u64>> {
        if !self.codec.supports_counters() {
            return Err(CacheError::Unsupported(format!(
                "{} values cannot be used as counters",
                self.codec.name()
            )));
        }
        let mapped = self.map_key(key);
        self.record(step.operation(), &mapped);
        let ttl = self.map_expiration(step.ttl);
        let value = counter::apply(&self.backend, &self.counters, &mapped, &step, ttl)?;
        debug!(key = %mapped, delta = step.delta, ?value, "counter step applied");
        Ok(value)
    }
}

impl<B: Backend> fmt::Debug for CacheClient<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.backend.name())
            .field("keys", &self.keys)
            .field("codec", &self.codec.name())
            .field("metrics", &self.metrics.is_some())
            .field("default_expiration", &self.default_expiration)
            .finish()
    }
}
