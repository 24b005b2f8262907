//! Background Tasks Module
//!
//! Contains background tasks the server may run alongside the cache.
//!
//! # Tasks
//! - Expiry sweep: Deletes expired cache entries at a configured interval

mod sweep;

pub use sweep::spawn_sweep_task;
