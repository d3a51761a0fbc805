// src/recorder/session.rs
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::capture::{CaptureBackend, CaptureChild, CaptureOutcome};

use super::paths;

/// Lifecycle of one capture attempt:
/// `Starting → Running → (stop requested) → Stopping → Ended`,
/// or `Starting/Running → Ended` directly when the process dies on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Ended,
}

/// One capture attempt producing one segment file. Owned by the supervisor;
/// at most one session exists in a non-`Ended` state at any time.
pub struct Session<C: CaptureChild> {
    pub started_at: DateTime<Utc>,
    pub output_path: PathBuf,
    pub state: SessionState,
    child: C,
}

impl<C: CaptureChild> Session<C> {
    /// Derives the output path from the current UTC time, creates the day
    /// folder (idempotently) and spawns the capture process.
    pub fn begin<B>(backend: &B, stream_url: &str, base: &Path, ext: &str) -> anyhow::Result<Self>
    where
        B: CaptureBackend<Child = C>,
    {
        let started_at = Utc::now();
        let output_path = paths::segment_path(base, started_at, ext);

        let day_dir = paths::day_dir(base, started_at);
        create_dir_all(&day_dir)
            .with_context(|| format!("creating day folder {}", day_dir.display()))?;

        let child = backend.spawn(stream_url, &output_path)?;

        Ok(Self {
            started_at,
            output_path,
            state: SessionState::Starting,
            child,
        })
    }

    pub fn mark_running(&mut self) {
        if self.state == SessionState::Starting {
            self.state = SessionState::Running;
        }
    }

    /// Graceful stop request. Termination is still observed through `wait`.
    pub fn request_stop(&mut self) {
        if matches!(self.state, SessionState::Starting | SessionState::Running) {
            self.state = SessionState::Stopping;
            self.child.request_stop();
        }
    }

    pub fn start_kill(&mut self) -> anyhow::Result<()> {
        self.child.start_kill()
    }

    pub async fn wait(&mut self) -> anyhow::Result<CaptureOutcome> {
        let outcome = self.child.wait().await;
        self.state = SessionState::Ended;
        outcome
    }
}
