// src/retention/mod.rs

pub mod monitor;
pub mod sweep;

pub use monitor::RetentionMonitor;
pub use sweep::{Evicted, dir_size, evict_oldest};
