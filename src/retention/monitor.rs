// src/retention/monitor.rs
use std::path::PathBuf;
use std::time::Duration;

use log::{info, trace, warn};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use crate::config::Config;

use super::sweep;

/// Keeps the recordings tree at or below the configured byte threshold.
///
/// Each tick measures the tree from scratch and, when over threshold, runs
/// exactly one eviction pass. Convergence happens across ticks; evicting at
/// most one file per poll interval also guarantees the file capture is
/// currently writing (freshly born, never the oldest) is left alone.
pub struct RetentionMonitor {
    base_dir: PathBuf,
    threshold_bytes: u64,
    poll_interval: Duration,
}

impl RetentionMonitor {
    pub fn new(base_dir: PathBuf, threshold_bytes: u64, poll_interval: Duration) -> Self {
        Self {
            base_dir,
            threshold_bytes,
            poll_interval,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.recordings_dir.clone(),
            cfg.disk_threshold_bytes,
            cfg.retention_poll_interval(),
        )
    }

    /// Runs until the shutdown flag flips. Tick failures are logged and
    /// retried on the next tick; nothing in here is fatal.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "[retention] threshold {} bytes, polling every {:?}",
            self.threshold_bytes, self.poll_interval
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                    info!("[retention] stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!("[retention] pass failed, retrying next tick: {:#}", e);
                    }
                }
            }
        }
    }

    /// One poll: fresh recursive size measurement, then at most one eviction.
    pub async fn tick(&self) -> anyhow::Result<()> {
        let total = sweep::dir_size(&self.base_dir).await?;

        if total <= self.threshold_bytes {
            trace!(
                "[retention] {} / {} bytes, nothing to do",
                total, self.threshold_bytes
            );
            return Ok(());
        }

        info!(
            "[retention] {} bytes used, over threshold {}",
            total, self.threshold_bytes
        );

        match sweep::evict_oldest(&self.base_dir).await? {
            Some(evicted) => {
                info!(
                    "[retention] removed {} ({} bytes)",
                    evicted.file.display(),
                    evicted.bytes
                );
                if let Some(dir) = &evicted.removed_dir {
                    info!("[retention] removed empty day folder {}", dir.display());
                }
            }
            None => info!("[retention] over threshold but nothing evictable"),
        }

        Ok(())
    }
}
