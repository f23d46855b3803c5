//! Background Tasks Module
//!
//! Contains background tasks that run alongside the cache.
//!
//! # Tasks
//! - TTL Sweep: Purges expired entries from the in-memory store at a fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, SweepHandle};
