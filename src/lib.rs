// src/lib.rs
pub mod capture;
pub mod config;
pub mod recorder;
pub mod retention;
pub mod testing;

// Re-Exports der wichtigsten Typen
pub use capture::{CaptureBackend, CaptureChild, CaptureOutcome, FfmpegBackend};
pub use config::Config;
pub use recorder::{Session, SessionState, Supervisor, SupervisorConfig};
pub use retention::RetentionMonitor;
