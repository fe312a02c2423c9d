//! Layercache - a uniform caching layer over interchangeable backends
//!
//! Provides key namespacing, value codecs, counters with a guaranteed initial
//! value, and a bounded in-memory front, all behind one [`Cache`] contract.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use backend::{Backend, KvStore, MemoryStore, SharedMemoryStore};
pub use cache::{Cache, CacheClient, CounterStep, Expiration, InMemoryFront, Value};
pub use config::CacheConfig;
pub use error::{CacheError, Outcome, Result};
pub use tasks::spawn_cleanup_task;
