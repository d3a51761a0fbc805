// src/recorder/mod.rs

pub mod paths;
pub mod session;
pub mod supervisor;

pub use session::{Session, SessionState};
pub use supervisor::{Supervisor, SupervisorConfig};
