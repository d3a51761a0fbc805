// src/recorder/supervisor.rs
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use crate::capture::{CaptureBackend, CaptureOutcome};
use crate::config::Config;

use super::session::Session;

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub stream_url: String,
    pub base_dir: PathBuf,
    pub segment_duration: Duration,
    pub restart_delay: Duration,
    pub stop_grace: Duration,
    pub container_ext: String,
}

impl SupervisorConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            stream_url: cfg.stream_url.clone(),
            base_dir: cfg.recordings_dir.clone(),
            segment_duration: cfg.segment_duration(),
            restart_delay: cfg.restart_delay(),
            stop_grace: cfg.stop_grace(),
            container_ext: cfg.ffmpeg.container_ext.clone(),
        }
    }
}

enum SessionEvent {
    Shutdown,
    Rotate,
    Ended(anyhow::Result<CaptureOutcome>),
}

/// Keeps exactly one capture session alive, forever.
///
/// A rotation timer armed at session start requests a graceful stop after the
/// segment duration; the replacement session is only created once the old
/// process has actually exited, so two encoders never run concurrently.
/// Every termination, clean or not, leads to a restart after a short fixed
/// delay. There is no retry ceiling: a broken source means a restart loop,
/// and recording resumes the moment the source comes back.
pub struct Supervisor<B: CaptureBackend> {
    cfg: SupervisorConfig,
    backend: B,
}

impl<B: CaptureBackend> Supervisor<B> {
    pub fn new(cfg: SupervisorConfig, backend: B) -> Self {
        Self { cfg, backend }
    }

    /// Runs until the shutdown flag flips. Shutdown stops the current session
    /// gracefully and does not start a replacement.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        create_dir_all(&self.cfg.base_dir).with_context(|| {
            format!(
                "creating recordings directory {}",
                self.cfg.base_dir.display()
            )
        })?;

        info!(
            "[supervisor] recording {} in {}s segments under {}",
            self.cfg.stream_url,
            self.cfg.segment_duration.as_secs(),
            self.cfg.base_dir.display()
        );

        loop {
            if *shutdown.borrow() {
                info!("[supervisor] stopped");
                return Ok(());
            }

            let mut session = match Session::begin(
                &self.backend,
                &self.cfg.stream_url,
                &self.cfg.base_dir,
                &self.cfg.container_ext,
            ) {
                Ok(session) => session,
                Err(e) => {
                    error!("[supervisor] failed to start capture: {:#}", e);
                    if self.pause_before_restart(&mut shutdown).await {
                        info!("[supervisor] stopped");
                        return Ok(());
                    }
                    continue;
                }
            };

            info!("[supervisor] recording → {}", session.output_path.display());
            session.mark_running();

            let rotate = sleep(self.cfg.segment_duration);
            tokio::pin!(rotate);

            let event = tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => SessionEvent::Shutdown,
                _ = &mut rotate => SessionEvent::Rotate,
                outcome = session.wait() => SessionEvent::Ended(outcome),
            };

            let (outcome, shutting_down) = match event {
                SessionEvent::Shutdown => {
                    info!("[supervisor] shutdown requested, stopping current session");
                    (self.stop_session(&mut session).await, true)
                }
                SessionEvent::Rotate => {
                    debug!("[supervisor] segment complete, rotating");
                    (self.stop_session(&mut session).await, false)
                }
                SessionEvent::Ended(outcome) => (outcome, false),
            };

            match outcome {
                Ok(outcome) => info!(
                    "[supervisor] session ended: {} ({})",
                    outcome,
                    session.output_path.display()
                ),
                Err(e) => warn!("[supervisor] session ended with error: {:#}", e),
            }

            if shutting_down {
                info!("[supervisor] stopped");
                return Ok(());
            }

            if self.pause_before_restart(&mut shutdown).await {
                info!("[supervisor] stopped");
                return Ok(());
            }
        }
    }

    /// Graceful stop with a bounded grace period. A process that ignores the
    /// stop request is killed so the supervisor never blocks on a wedged
    /// encoder.
    async fn stop_session(
        &self,
        session: &mut Session<B::Child>,
    ) -> anyhow::Result<CaptureOutcome> {
        session.request_stop();

        match timeout(self.cfg.stop_grace, session.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "[supervisor] capture ignored stop request for {:?}, killing",
                    self.cfg.stop_grace
                );
                session.start_kill()?;
                session.wait().await
            }
        }
    }

    /// Fixed delay between sessions so an instantly-failing encoder does not
    /// peg the CPU. Returns true when shutdown arrived during the delay.
    async fn pause_before_restart(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = sleep(self.cfg.restart_delay) => false,
            _ = shutdown.wait_for(|stop| *stop) => true,
        }
    }
}
