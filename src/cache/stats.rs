//! Front Statistics Module
//!
//! Point-in-time view of an in-memory front: how reads split between the
//! shadow and the wrapped cache, and how full the shadow is.

use serde::Serialize;

// == Front Stats ==
/// Snapshot taken by [`InMemoryFront::stats`](crate::cache::InMemoryFront::stats).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrontStats {
    /// Keys answered from the local shadow
    pub hits: u64,
    /// Keys that had to be read from the wrapped cache
    pub misses: u64,
    /// Entries pushed out to stay within capacity
    pub evictions: u64,
    /// Batched reads forwarded to the wrapped cache as one call
    pub batch_fetches: u64,
    /// Current number of shadowed entries
    pub total_entries: usize,
    /// Shadow capacity
    pub capacity: usize,
}

impl FrontStats {
    /// Share of key reads served without touching the wrapped cache.
    ///
    /// 0.0 before any read.
    pub fn shadowed_read_ratio(&self) -> f64 {
        match self.hits + self.misses {
            0 => 0.0,
            reads => self.hits as f64 / reads as f64,
        }
    }

    /// How full the shadow is, 1.0 meaning at capacity.
    ///
    /// A zero-capacity front is reported as full.
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.total_entries as f64 / self.capacity as f64
    }
}
