//! Cache Module
//!
//! Provides the uniform cache contract, the backend-bound client, the
//! in-memory front and the pieces they are built from.
//!
//! # Layers
//! - [`CacheClient`]: one backend plus key namespace, codec, default expiry and metrics
//! - [`InMemoryFront`]: bounded local shadow stacked over any [`Cache`]

mod client;
pub mod counter;
mod codec;
mod entry;
mod fifo;
mod front;
mod key;
mod layer;
mod metrics;
mod stats;
mod store;
mod value;


// Re-export public types
pub use client::CacheClient;
pub use codec::{CompressedCodec, EncryptedCodec, PlainCodec, ValueCodec};
pub use counter::{CounterOp, CounterRegistry, CounterStep};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use fifo::FifoTracker;
pub use front::{InMemoryFront, DEFAULT_MAX_LOCAL_ENTRIES};
pub use key::KeyMapper;
pub use layer::Cache;
pub use metrics::{MetricSink, OperationTally, TracingSink};
pub use stats::FrontStats;
pub use store::EntryTable;
pub use value::{Expiration, Stamped, Value};
