//! Counter Module
//!
//! Increment/decrement with an initial value, applied identically over every
//! backend.
//!
//! Some native counter primitives return corrupted results when asked to
//! create a missing key and apply an offset in one call. The protocol never
//! lets that happen:
//!
//! 1. The first time a client touches a key it tries `add(key, initial)`. If
//!    the add wins, the counter now holds `initial` and the step is done; the
//!    offset is NOT applied on top.
//! 2. Otherwise the key exists, and the native counter primitive is safe.
//! 3. The key is remembered so later steps skip the add.
//!
//! Backends that pipeline get the same observable result in one atomic round
//! trip: `AddIfAbsent(initial - delta)`, `IncrBy(delta)`, `Expire` when the
//! counter expires, then `ClampAtZero`. Every reply is checked.
//!
//! Counters never go below zero and saturate at `i64::MAX`.

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::backend::{encode_counter, Backend, Command, Reply};
use crate::cache::Expiration;
use crate::error::{CacheError, Result};

/// Which counter method the caller invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOp {
    Increment,
    Decrement,
}

impl CounterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterOp::Increment => "increment",
            CounterOp::Decrement => "decrement",
        }
    }
}

// == Counter Step ==
/// One increment or decrement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterStep {
    pub op: CounterOp,
    /// Signed amount added to the counter
    pub delta: i64,
    /// Value a missing counter starts at (the offset is not applied on creation)
    pub initial: i64,
    /// Expiration in seconds, None = instance default
    pub ttl: Option<u64>,
}

impl CounterStep {
    pub fn increment(offset: i64) -> Self {
        Self {
            op: CounterOp::Increment,
            delta: offset,
            initial: 0,
            ttl: None,
        }
    }

    pub fn decrement(offset: i64) -> Self {
        Self {
            op: CounterOp::Decrement,
            delta: offset.saturating_neg(),
            initial: 0,
            ttl: None,
        }
    }

    pub fn initial(mut self, initial: i64) -> Self {
        self.initial = initial;
        self
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl = Some(seconds);
        self
    }

    /// Operation name used for metrics and logs.
    pub fn operation(&self) -> &'static str {
        self.op.as_str()
    }

    /// Rejects steps no backend could honour.
    ///
    /// A pipelined creation seeds `initial - delta`, so a step where that
    /// difference overflows is refused on every backend.
    pub fn validate(&self) -> Result<()> {
        if self.initial < 0 {
            return Err(CacheError::InvalidArgument(format!(
                "Initial counter value must be non-negative, got {}",
                self.initial
            )));
        }
        if self.initial.checked_sub(self.delta).is_none() {
            return Err(CacheError::InvalidArgument(format!(
                "counter step of {} from {} overflows",
                self.delta, self.initial
            )));
        }
        Ok(())
    }
}

// == Counter Registry ==
/// Keys this client has already initialized.
///
/// Process-local and per client. Losing it is safe: the worst case is one
/// redundant `add`. The lock only guards the set itself; two threads touching
/// a fresh key together may both try the `add`, and the backend lets one win.
#[derive(Debug, Default)]
pub struct CounterRegistry {
    keys: Mutex<HashSet<String>>,
}

impl CounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self, key: &str) -> bool {
        self.keys.lock().contains(key)
    }

    pub fn mark_initialized(&self, key: &str) {
        self.keys.lock().insert(key.to_string());
    }

    /// Forgets a key, so the next step re-runs the add.
    pub fn forget(&self, key: &str) {
        self.keys.lock().remove(key);
    }

    pub fn clear(&self) {
        self.keys.lock().clear();
    }
}

// == Apply ==
/// Runs one counter step against `backend` for an already mapped key.
///
/// Returns `Ok(Some(value))` with the counter's new value, `Ok(None)` when
/// the stored value is not an integer (it is left untouched), and `Err` for
/// invalid steps, missing capabilities and backend failures.
pub fn apply<B: Backend + ?Sized>(
    backend: &B,
    registry: &CounterRegistry,
    key: &str,
    step: &CounterStep,
    ttl: Expiration,
) -> Result<Option<u64>> {
    step.validate()?;

    if backend.supports_pipelining() {
        let outcome = pipelined(backend, key, step, ttl)?;
        registry.mark_initialized(key);
        return Ok(outcome);
    }

    if !backend.supports_counters() {
        return Err(CacheError::Unsupported(format!(
            "{} cannot {} counters",
            backend.name(),
            step.operation()
        )));
    }

    if !registry.is_initialized(key) {
        let added = backend.add(key, &encode_counter(step.initial), ttl)?;
        registry.mark_initialized(key);
        if added {
            debug!(key, initial = step.initial, "counter initialized by add");
            return Ok(Some(step.initial as u64));
        }
    }

    let initial = step.initial as u64;
    let native = if step.delta >= 0 {
        backend.increment(key, step.delta as u64, initial, ttl)
    } else {
        backend.decrement(key, step.delta.unsigned_abs(), initial, ttl)
    };

    match native {
        Ok(value) => Ok(Some(value)),
        Err(CacheError::TypeMismatch(reason)) => {
            debug!(key, %reason, "counter step rejected");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Seeds, offsets, expires and clamps in one atomic batch.
///
/// The seed is `initial - delta`, so a key created by this batch ends at
/// exactly `initial` once the increment lands. The clamp always runs: a
/// counter written negative by someone else comes back as zero.
fn pipelined<B: Backend + ?Sized>(
    backend: &B,
    key: &str,
    step: &CounterStep,
    ttl: Expiration,
) -> Result<Option<u64>> {
    let seed = step.initial.saturating_sub(step.delta);

    let mut commands = Vec::with_capacity(4);
    commands.push(Command::AddIfAbsent {
        key: key.to_string(),
        value: encode_counter(seed),
        ttl,
    });
    commands.push(Command::IncrBy {
        key: key.to_string(),
        delta: step.delta,
    });
    if ttl != Expiration::Never {
        commands.push(Command::Expire {
            key: key.to_string(),
            ttl,
        });
    }
    commands.push(Command::ClampAtZero {
        key: key.to_string(),
    });

    let replies = backend.execute(&commands)?;
    if replies.len() != commands.len() {
        return Err(CacheError::Pipeline(format!(
            "expected {} replies for {key}, got {}",
            commands.len(),
            replies.len()
        )));
    }

    let mut value = None;
    for (command, reply) in commands.iter().zip(replies) {
        match (command, reply) {
            // The batch stopped here; nothing after the failed command ran
            (_, Reply::Error(CacheError::TypeMismatch(reason))) => {
                debug!(key, %reason, "counter step rejected");
                return Ok(None);
            }
            (_, Reply::Error(err)) if !err.is_infrastructure() => return Err(err),
            (_, Reply::Error(err)) => {
                warn!(key, error = %err, "counter pipeline failed");
                return Err(CacheError::Pipeline(format!("{command:?} failed: {err}")));
            }
            (Command::IncrBy { .. } | Command::ClampAtZero { .. }, Reply::Int(v)) => {
                value = Some(v);
            }
            (Command::AddIfAbsent { .. } | Command::Expire { .. }, Reply::Bool(_)) => {}
            (command, reply) => {
                return Err(CacheError::Pipeline(format!(
                    "unexpected reply {reply:?} to {command:?}"
                )));
            }
        }
    }

    match value {
        Some(v) => u64::try_from(v)
            .map(Some)
            .map_err(|_| CacheError::Pipeline(format!("counter {key} is negative ({v})"))),
        None => Err(CacheError::Pipeline(format!(
            "no counter value reported for {key}"
        ))),
    }
}
