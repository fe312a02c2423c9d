//! Background Tasks Module
//!
//! Periodic maintenance for stores that hold real-time expiring entries.
//!
//! # Tasks
//! - Expiry cleanup: purges expired entries at a fixed interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
