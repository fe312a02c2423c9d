//! Metric Sink Module
//!
//! Side channel recording one count per cache operation, tagged by backend
//! name, operation name and mapped key. Sinks are injected per client.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::trace;

// == Metric Sink Trait ==
/// Receives one event per cache operation.
///
/// Recording is fire-and-forget: implementations must not panic and must not
/// block the caller for longer than a short critical section.
pub trait MetricSink: Send + Sync + fmt::Debug {
    fn record_operation(&self, backend: &str, operation: &str, mapped_key: &str);
}

// == Tracing Sink ==
/// Emits every operation as a `trace` event on the `layercache::metrics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn record_operation(&self, backend: &str, operation: &str, mapped_key: &str) {
        trace!(
            target: "layercache::metrics",
            backend,
            operation,
            key = mapped_key,
            "cache operation"
        );
    }
}

// == Operation Tally ==
/// Counts operations per `(backend, operation)` pair in memory.
#[derive(Debug, Default)]
pub struct OperationTally {
    counts: Mutex<HashMap<(String, String), u64>>,
    last_key: Mutex<Option<String>>,
}

impl OperationTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded operations of one kind against one backend.
    pub fn count(&self, backend: &str, operation: &str) -> u64 {
        self.counts
            .lock()
            .get(&(backend.to_string(), operation.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of recorded operations.
    pub fn total(&self) -> u64 {
        self.counts.lock().values().sum()
    }

    /// Mapped key tagged on the most recent operation.
    pub fn last_key(&self) -> Option<String> {
        self.last_key.lock().clone()
    }
}

impl MetricSink for OperationTally {
    fn record_operation(&self, backend: &str, operation: &str, mapped_key: &str) {
        *self
            .counts
            .lock()
            .entry((backend.to_string(), operation.to_string()))
            .or_insert(0) += 1;
        *self.last_key.lock() = Some(mapped_key.to_string());
    }
}
