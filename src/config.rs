// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_rtsp_transport")]
    pub rtsp_transport: String,
    #[serde(default = "default_container_ext")]
    pub container_ext: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary() -> String {
    "ffmpeg".to_string()
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_rtsp_transport() -> String {
    "tcp".to_string()
}

fn default_container_ext() -> String {
    "mkv".to_string()
}

fn default_restart_delay_ms() -> u64 {
    50
}

fn default_stop_grace_seconds() -> u64 {
    10
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            rtsp_transport: default_rtsp_transport(),
            container_ext: default_container_ext(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub stream_url: String,
    pub recordings_dir: PathBuf,
    pub segment_seconds: u64,
    pub disk_threshold_bytes: u64,
    pub retention_poll_seconds: u64,
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    #[serde(default = "default_stop_grace_seconds")]
    pub stop_grace_seconds: u64,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading config file {}", path))?;
        let config: Self = toml::from_str(&content)?;
        config.validate().context("config validation failed")?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stream_url.trim().is_empty() {
            bail!("stream_url must not be empty");
        }
        if self.recordings_dir.as_os_str().is_empty() {
            bail!("recordings_dir must not be empty");
        }
        if self.segment_seconds == 0 {
            bail!("segment_seconds must be > 0");
        }
        if self.disk_threshold_bytes == 0 {
            bail!("disk_threshold_bytes must be > 0");
        }
        if self.retention_poll_seconds == 0 {
            bail!("retention_poll_seconds must be > 0");
        }
        if self.stop_grace_seconds == 0 {
            bail!("stop_grace_seconds must be > 0");
        }
        self.ffmpeg.validate()?;
        Ok(())
    }

    pub fn segment_duration(&self) -> Duration {
        Duration::from_secs(self.segment_seconds)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_seconds)
    }

    pub fn retention_poll_interval(&self) -> Duration {
        Duration::from_secs(self.retention_poll_seconds)
    }
}

impl FfmpegConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.binary.trim().is_empty() {
            bail!("ffmpeg.binary must not be empty");
        }
        if self.video_codec.trim().is_empty() {
            bail!("ffmpeg.video_codec must not be empty");
        }
        if self.audio_codec.trim().is_empty() {
            bail!("ffmpeg.audio_codec must not be empty");
        }
        if self.rtsp_transport.trim().is_empty() {
            bail!("ffmpeg.rtsp_transport must not be empty");
        }
        if self.container_ext.trim().is_empty() || self.container_ext.contains('.') {
            bail!("ffmpeg.container_ext must be a bare extension like \"mkv\"");
        }
        Ok(())
    }
}
