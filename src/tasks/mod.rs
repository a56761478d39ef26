//! Background Tasks Module
//!
//! Periodic housekeeping that runs alongside request handling.
//!
//! # Tasks
//! - TTL Cleanup: removes expired records from the in-memory engine
//! - Rate Limit Sweep: drops per-client buckets idle for over an hour

mod cleanup;
mod sweep;

pub use cleanup::spawn_cleanup_task;
pub use sweep::{spawn_rate_limit_sweep, SWEEP_INTERVAL};
