// src/capture/mod.rs

use std::fmt;
use std::future::Future;
use std::path::Path;

pub mod ffmpeg;

pub use ffmpeg::FfmpegBackend;

/// How a capture process terminated. Clean and failed exits get identical
/// supervisor handling; the distinction only matters for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Finished,
    Failed(Option<i32>),
}

impl fmt::Display for CaptureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureOutcome::Finished => write!(f, "finished"),
            CaptureOutcome::Failed(Some(code)) => write!(f, "failed with exit code {}", code),
            CaptureOutcome::Failed(None) => write!(f, "failed (killed by signal)"),
        }
    }
}

/// One running capture process writing a single output file.
pub trait CaptureChild: Send + 'static {
    /// Ask the process to stop and finalize its output. Must not block;
    /// termination is observed via `wait`.
    fn request_stop(&mut self);

    /// Hard escalation for a process that ignores `request_stop`.
    fn start_kill(&mut self) -> anyhow::Result<()>;

    /// Wait for the process to exit, however that happens.
    fn wait(&mut self) -> impl Future<Output = anyhow::Result<CaptureOutcome>> + Send;
}

/// Spawns capture processes. The seam that lets tests drive the supervisor
/// without a real encoder.
pub trait CaptureBackend: Send + Sync + 'static {
    type Child: CaptureChild;

    fn spawn(&self, stream_url: &str, output_path: &Path) -> anyhow::Result<Self::Child>;
}
