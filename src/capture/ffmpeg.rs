// src/capture/ffmpeg.rs
use std::future::Future;
use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

use crate::config::FfmpegConfig;

use super::{CaptureBackend, CaptureChild, CaptureOutcome};

/// Runs ffmpeg as the capture process: RTSP in, one container file out.
/// Graceful stop is ffmpeg's own `q` command on stdin, which finalizes the
/// container before exiting.
pub struct FfmpegBackend {
    cfg: FfmpegConfig,
}

impl FfmpegBackend {
    pub fn new(cfg: FfmpegConfig) -> Self {
        Self { cfg }
    }
}

impl CaptureBackend for FfmpegBackend {
    type Child = FfmpegChild;

    fn spawn(&self, stream_url: &str, output_path: &Path) -> anyhow::Result<FfmpegChild> {
        // -y: a restart within the same second targets the same path; blocking
        // on the overwrite prompt would wedge the session.
        let mut cmd = Command::new(&self.cfg.binary);
        cmd.arg("-hide_banner")
            .arg("-y")
            .arg("-loglevel")
            .arg("error")
            .arg("-rtsp_transport")
            .arg(&self.cfg.rtsp_transport)
            .arg("-f")
            .arg("rtsp")
            .arg("-i")
            .arg(stream_url)
            .arg("-c:v")
            .arg(&self.cfg.video_codec)
            .arg("-c:a")
            .arg(&self.cfg.audio_codec)
            .arg("-reset_timestamps")
            .arg("1")
            .args(&self.cfg.extra_args)
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {}", self.cfg.binary))?;
        let stdin = child.stdin.take();

        debug!("[capture] ffmpeg started → {}", output_path.display());

        Ok(FfmpegChild { child, stdin })
    }
}

pub struct FfmpegChild {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl CaptureChild for FfmpegChild {
    fn request_stop(&mut self) {
        // Sending `q` twice or after exit is harmless; the write just fails.
        if let Some(mut stdin) = self.stdin.take() {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(b"q").await {
                    debug!("[capture] stop request not delivered: {}", e);
                    return;
                }
                let _ = stdin.shutdown().await;
            });
        }
    }

    fn start_kill(&mut self) -> anyhow::Result<()> {
        self.child.start_kill().context("killing capture process")
    }

    fn wait(&mut self) -> impl Future<Output = anyhow::Result<CaptureOutcome>> + Send {
        async move {
            let status = self
                .child
                .wait()
                .await
                .context("waiting for capture process")?;
            if status.success() {
                Ok(CaptureOutcome::Finished)
            } else {
                Ok(CaptureOutcome::Failed(status.code()))
            }
        }
    }
}
