//! Integration Tests for the Cache Client
//!
//! Exercises `CacheClient` over every shipped backend through the public API,
//! plus test doubles for backends with missing or defective capabilities.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use layercache::cache::{CompressedCodec, EncryptedCodec, OperationTally, Stamped};
use layercache::{
    Backend, Cache, CacheClient, CacheConfig, CacheError, CounterStep, Expiration, KvStore,
    MemoryStore, Outcome, Result, SharedMemoryStore,
};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "layercache=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

/// Backend without native counters or pipelines.
struct PlainKvOnly(MemoryStore);

impl Backend for PlainKvOnly {
    fn name(&self) -> &str {
        "plain-only"
    }
    fn add(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.0.add(key, value, ttl)
    }
    fn set(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.0.set(key, value, ttl)
    }
    fn replace(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.0.replace(key, value, ttl)
    }
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.0.get(key)
    }
    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.0.get_many(keys)
    }
    fn delete(&self, key: &str) -> Result<bool> {
        self.0.delete(key)
    }
    fn flush(&self) -> Result<bool> {
        self.0.flush()
    }
    fn expire(&self, key: &str, ttl: Expiration) -> Result<bool> {
        self.0.expire(key, ttl)
    }
}

/// Backend whose native counter corrupts results when the key is missing.
struct DefectiveCounters(MemoryStore);

impl DefectiveCounters {
    fn native(&self, key: &str, delta: i64, initial: u64, ttl: Expiration) -> Result<u64> {
        if !self.0.exists(key)? {
            // Corrupted answer: neither `initial` nor `initial + delta`
            return Ok(initial.wrapping_mul(1000).wrapping_add(delta as u64));
        }
        if delta >= 0 {
            self.0.increment(key, delta as u64, initial, ttl)
        } else {
            self.0.decrement(key, delta.unsigned_abs(), initial, ttl)
        }
    }
}

impl Backend for DefectiveCounters {
    fn name(&self) -> &str {
        "defective"
    }
    fn add(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.0.add(key, value, ttl)
    }
    fn set(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.0.set(key, value, ttl)
    }
    fn replace(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.0.replace(key, value, ttl)
    }
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.0.get(key)
    }
    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.0.get_many(keys)
    }
    fn delete(&self, key: &str) -> Result<bool> {
        self.0.delete(key)
    }
    fn flush(&self) -> Result<bool> {
        self.0.flush()
    }
    fn expire(&self, key: &str, ttl: Expiration) -> Result<bool> {
        self.0.expire(key, ttl)
    }
    fn supports_counters(&self) -> bool {
        true
    }
    fn increment(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        self.native(key, offset as i64, initial, ttl)
    }
    fn decrement(&self, key: &str, offset: u64, initial: u64, ttl: Expiration) -> Result<u64> {
        self.native(key, -(offset as i64), initial, ttl)
    }
}

fn counter_sequence<B: Backend>(backend: B) {
    let client = CacheClient::new(backend);

    let step = CounterStep::increment(2).initial(5);
    assert_eq!(client.apply_counter("visits", step).unwrap(), Some(5));
    assert_eq!(client.apply_counter("visits", step).unwrap(), Some(7));
    assert_eq!(client.get("visits").unwrap(), Some(json!(7)));

    assert!(client.decrement("stock", 200, 10, None).unwrap());
    assert_eq!(client.get("stock").unwrap(), Some(json!(10)));
    assert!(client.decrement("stock", 200, 10, None).unwrap());
    assert_eq!(client.get("stock").unwrap(), Some(json!(0)));
}

// == Counter Tests ==

#[test]
fn test_counter_initial_value_on_memory_store() {
    init_tracing();
    counter_sequence(MemoryStore::new());
}

#[test]
fn test_counter_initial_value_on_shared_store() {
    init_tracing();
    counter_sequence(SharedMemoryStore::new());
}

#[test]
fn test_counter_initial_value_on_kv_store() {
    init_tracing();
    counter_sequence(KvStore::new());
}

#[test]
fn test_counter_never_trusts_native_create() {
    init_tracing();
    counter_sequence(DefectiveCounters(MemoryStore::new()));
}

#[test]
fn test_counter_on_non_numeric_value_fails_softly() {
    init_tracing();
    for client in [
        Box::new(CacheClient::new(MemoryStore::new())) as Box<dyn Cache>,
        Box::new(CacheClient::new(SharedMemoryStore::new())),
        Box::new(CacheClient::new(KvStore::new())),
    ] {
        client.set("label", &json!("A"), None).unwrap();
        assert!(!client.decrement("label", 1, 0, None).unwrap());
        assert!(!client.increment("label", 1, 0, None).unwrap());
        assert_eq!(client.get("label").unwrap(), Some(json!("A")));
    }
}

#[test]
fn test_counter_rejects_negative_initial() {
    init_tracing();
    let store = MemoryStore::new();
    let client = CacheClient::new(store.clone());

    let result = client.increment("c", 1, -5, None);
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
    assert!(store.is_empty());
}

#[test]
fn test_counter_without_capability_is_unsupported() {
    init_tracing();
    let client = CacheClient::new(PlainKvOnly(MemoryStore::new()));

    let result = client.increment("c", 1, 0, None);
    assert!(matches!(result, Err(CacheError::Unsupported(_))));
    assert!(!client.increment("c", 1, 0, None).succeeded());
    assert_eq!(client.get("c").unwrap(), None);

    // Plain operations still work
    assert!(client.set("k", &json!(1), None).unwrap());
    assert_eq!(client.get("k").unwrap(), Some(json!(1)));
}

#[test]
fn test_counter_expiration_is_applied() {
    init_tracing();
    let kv = KvStore::new();
    let client = CacheClient::new(kv.clone()).with_default_expiration(120);
    client.increment("c", 1, 0, None).unwrap();
    assert_eq!(kv.ttl("c"), Some(Some(120)));

    let memory = MemoryStore::new();
    let client = CacheClient::new(memory.clone());
    client.increment("c", 1, 0, Some(30)).unwrap();
    assert_eq!(memory.expiration_of("c"), Some(Expiration::Seconds(30)));
}

#[test]
fn test_rejected_counter_step_keeps_expiration() {
    init_tracing();
    let kv = KvStore::new();
    let client = CacheClient::new(kv.clone());
    client.set("label", &json!("A"), Some(0)).unwrap();
    assert!(!client.increment("label", 1, 0, Some(30)).unwrap());
    assert_eq!(kv.ttl("label"), Some(None));

    let memory = MemoryStore::new();
    let client = CacheClient::new(memory.clone());
    client.set("label", &json!("A"), Some(0)).unwrap();
    assert!(!client.increment("label", 1, 0, Some(30)).unwrap());
    assert_eq!(memory.expiration_of("label"), Some(Expiration::Never));
}

#[test]
fn test_negative_counter_written_elsewhere_clamps() {
    init_tracing();
    for client in [
        Box::new(CacheClient::new(MemoryStore::new())) as Box<dyn Cache>,
        Box::new(CacheClient::new(SharedMemoryStore::new())),
        Box::new(CacheClient::new(KvStore::new())),
    ] {
        client.set("c", &json!(-5), None).unwrap();
        assert!(client.increment("c", 1, 0, None).unwrap());
        assert_eq!(client.get("c").unwrap(), Some(json!(0)));
        assert!(client.increment("c", 1, 0, None).unwrap());
        assert_eq!(client.get("c").unwrap(), Some(json!(1)));
    }
}

#[test]
fn test_counter_overflow_saturates() {
    init_tracing();
    for client in [
        Box::new(CacheClient::new(MemoryStore::new())) as Box<dyn Cache>,
        Box::new(CacheClient::new(SharedMemoryStore::new())),
        Box::new(CacheClient::new(KvStore::new())),
    ] {
        client.set("c", &json!(i64::MAX - 1), None).unwrap();
        assert!(client.increment("c", 10, 0, None).unwrap());
        assert_eq!(client.get("c").unwrap(), Some(json!(i64::MAX)));
    }
}

#[test]
fn test_concurrent_first_touch_creates_once() {
    init_tracing();
    for backend in [
        Arc::new(SharedMemoryStore::new()) as Arc<dyn Backend>,
        Arc::new(KvStore::new()),
    ] {
        let client = Arc::new(CacheClient::new(backend));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let client = Arc::clone(&client);
                thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(client.increment("hits", 1, 0, None).unwrap());
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        // Exactly one step created the counter at 0; every other step added 1
        assert_eq!(client.get("hits").unwrap(), Some(json!(799)));
    }
}

// == Namespace Tests ==

#[test]
fn test_prefixes_isolate_clients_on_one_backend() {
    init_tracing();
    let shared = SharedMemoryStore::new();
    let users = CacheClient::new(shared.clone()).with_prefix("users");
    let orders = CacheClient::new(shared.clone()).with_prefix("orders");

    users.set("42", &json!("alice"), None).unwrap();
    orders.set("42", &json!({"total": 10}), None).unwrap();

    assert_eq!(users.get("42").unwrap(), Some(json!("alice")));
    assert_eq!(orders.get("42").unwrap(), Some(json!({"total": 10})));

    assert!(users.delete("42").unwrap());
    assert_eq!(orders.get("42").unwrap(), Some(json!({"total": 10})));
}

#[test]
fn test_flush_is_not_scoped_by_prefix() {
    init_tracing();
    let shared = KvStore::new();
    let a = CacheClient::new(shared.clone()).with_prefix("a");
    let b = CacheClient::new(shared.clone()).with_prefix("b");

    a.set("k", &json!(1), None).unwrap();
    b.set("k", &json!(2), None).unwrap();
    assert!(a.flush().unwrap());

    assert_eq!(b.get("k").unwrap(), None);
    assert!(shared.is_empty());
}

#[test]
fn test_config_drives_client() {
    init_tracing();
    let config = CacheConfig::default()
        .with_prefix("app")
        .with_suffix("v2")
        .with_default_expiration(45);
    let store = MemoryStore::new();
    let client = CacheClient::from_config(store.clone(), &config);

    client.set("user", &json!(1), None).unwrap();
    assert_eq!(
        store.expiration_of("app.user.v2"),
        Some(Expiration::Seconds(45))
    );
}

// == Expiration Tests ==

#[test]
fn test_entries_expire() {
    init_tracing();
    let store = MemoryStore::new();
    let client = CacheClient::new(store.clone()).with_default_expiration(60);

    client.set("short", &json!(1), Some(10)).unwrap();
    client.set("default", &json!(2), None).unwrap();
    client.set("forever", &json!(3), Some(0)).unwrap();

    store.time_passes(11);
    assert_eq!(client.get("short").unwrap(), None);
    assert_eq!(client.get("default").unwrap(), Some(json!(2)));

    store.time_passes(60);
    assert_eq!(client.get("default").unwrap(), None);
    assert_eq!(client.get("forever").unwrap(), Some(json!(3)));
}

// == Failure Tests ==

#[test]
fn test_unreachable_backend_is_an_error() {
    init_tracing();
    let store = MemoryStore::new();
    let client = CacheClient::new(store.clone());
    client.set("a", &json!(1), None).unwrap();
    store.set_available(false);

    assert!(matches!(
        client.get_many(&["a", "b"]),
        Err(CacheError::BackendUnavailable(_))
    ));
    assert!(matches!(
        client.get("a"),
        Err(CacheError::BackendUnavailable(_))
    ));
    assert!(!client.set("a", &json!(2), None).succeeded());

    store.set_available(true);
    assert_eq!(client.get("a").unwrap(), Some(json!(1)));
}

#[test]
fn test_declined_operations_are_not_errors() {
    init_tracing();
    let client = CacheClient::new(SharedMemoryStore::new());

    assert_eq!(client.get("missing").unwrap(), None);
    assert!(!client.replace("missing", &json!(1), None).unwrap());
    assert!(!client.delete("missing").unwrap());
    client.set("present", &json!(1), None).unwrap();
    assert!(!client.add("present", &json!(2), None).unwrap());
}

// == Codec Tests ==

#[test]
fn test_compressed_values_round_trip() {
    init_tracing();
    let store = KvStore::new();
    let client = CacheClient::new(store.clone()).with_codec(CompressedCodec::default());

    let document = json!({"items": vec!["repeated text"; 50]});
    client.set("doc", &document, None).unwrap();
    assert_eq!(client.get("doc").unwrap(), Some(document));

    // Counters stay readable through the compressing codec
    client.increment("n", 3, 4, None).unwrap();
    client.increment("n", 3, 4, None).unwrap();
    assert_eq!(client.get("n").unwrap(), Some(json!(7)));
}

#[test]
fn test_encrypted_values_are_opaque_on_the_backend() {
    init_tracing();
    let store = MemoryStore::new();
    let client = CacheClient::new(store.clone()).with_codec(EncryptedCodec::new([9u8; 32]));

    client.set("secret", &json!("launch code"), None).unwrap();
    let raw = store.contents().remove("secret").unwrap();
    assert!(!String::from_utf8_lossy(&raw).contains("launch code"));
    assert_eq!(client.get("secret").unwrap(), Some(json!("launch code")));

    let intruder = CacheClient::new(store.clone()).with_codec(EncryptedCodec::new([1u8; 32]));
    assert!(matches!(intruder.get("secret"), Err(CacheError::Codec(_))));

    assert!(matches!(
        client.increment("n", 1, 0, None),
        Err(CacheError::Unsupported(_))
    ));
}

#[test]
fn test_stamped_fragments_round_trip() {
    init_tracing();
    let client = CacheClient::new(SharedMemoryStore::new()).with_codec(CompressedCodec::default());

    let fragment = Stamped::now("<div>rendered</div>".to_string());
    client
        .set("fragment", &serde_json::to_value(&fragment).unwrap(), None)
        .unwrap();

    let cached: Stamped<String> =
        serde_json::from_value(client.get("fragment").unwrap().unwrap()).unwrap();
    assert_eq!(cached, fragment);
    assert!(cached.timestamp <= Utc::now());
    assert!(Utc::now() - cached.timestamp < Duration::minutes(1));
}

// == Metrics Tests ==

#[test]
fn test_metrics_record_each_operation() {
    init_tracing();
    let tally = Arc::new(OperationTally::new());
    let client = CacheClient::new(MemoryStore::with_name("primary"))
        .with_prefix("m")
        .with_metrics(tally.clone());

    client.add("a", &json!(1), None).unwrap();
    client.set("b", &json!(2), None).unwrap();
    client.replace("b", &json!(3), None).unwrap();
    client.get("a").unwrap();
    client.get_many(&["a", "b", "c"]).unwrap();
    assert_eq!(tally.last_key().as_deref(), Some("m.a,m.b,m.c"));
    client.increment("n", 1, 0, None).unwrap();
    client.delete("a").unwrap();

    for operation in ["add", "set", "replace", "get", "get_many", "increment", "delete"] {
        assert_eq!(tally.count("primary", operation), 1, "{operation}");
    }
    assert_eq!(tally.total(), 7);

    // Tagged by the method called, not the sign of the offset
    client.increment("n", -3, 0, None).unwrap();
    client.decrement("n", -3, 0, None).unwrap();
    assert_eq!(tally.count("primary", "increment"), 2);
    assert_eq!(tally.count("primary", "decrement"), 1);
}

#[test]
fn test_metrics_disabled_by_default() {
    init_tracing();
    let client = CacheClient::new(MemoryStore::new());
    client.set("a", &json!(1), None).unwrap();
    assert!(format!("{client:?}").contains("metrics: false"));

    let config = CacheConfig::default().with_metrics(true);
    let enabled = CacheClient::from_config(MemoryStore::new(), &config);
    assert!(format!("{enabled:?}").contains("metrics: true"));
}
