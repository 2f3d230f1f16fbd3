//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Expiry sweep: Drops expired providers at configured intervals

mod sweep;

pub use sweep::{spawn_sweep_task, spawn_sweep_task_from_config};
