//! Cache Value Module
//!
//! Value and expiration types shared by every layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque cached value. Any `Serialize` type enters through `serde_json::to_value`.
pub type Value = serde_json::Value;

// == Expiration ==
/// Backend-facing expiry of a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Entry never expires
    #[default]
    Never,
    /// Entry expires after the given number of seconds
    Seconds(u64),
}

impl Expiration {
    /// Converts a seconds count, treating 0 as "never expires".
    pub fn from_secs(seconds: u64) -> Self {
        if seconds == 0 {
            Expiration::Never
        } else {
            Expiration::Seconds(seconds)
        }
    }

    /// Resolves a per-call expiration against an instance default.
    ///
    /// `None` means "use the default"; both are in seconds with 0 meaning never.
    pub fn resolve(requested: Option<u64>, default_seconds: u64) -> Self {
        Self::from_secs(requested.unwrap_or(default_seconds))
    }

    /// Returns the number of seconds, or None if the entry never expires.
    pub fn as_secs(&self) -> Option<u64> {
        match self {
            Expiration::Never => None,
            Expiration::Seconds(s) => Some(*s),
        }
    }
}

// == Stamped ==
/// A cached fragment remembering when it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stamped<T> {
    /// The cached content
    pub value: T,
    /// When the content was produced
    pub timestamp: DateTime<Utc>,
}

impl<T> Stamped<T> {
    /// Stamps a value with the current time.
    pub fn now(value: T) -> Self {
        Self {
            value,
            timestamp: Utc::now(),
        }
    }

    /// Age of the fragment in whole seconds.
    pub fn age_seconds(&self) -> i64 {
        (Utc::now() - self.timestamp).num_seconds()
    }
}
