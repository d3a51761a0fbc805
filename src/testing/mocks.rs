// src/testing/mocks.rs
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use tokio::sync::Notify;

use crate::capture::{CaptureBackend, CaptureChild, CaptureOutcome};

/// Scripted capture behaviors for supervisor tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Healthy encoder: runs until asked to stop, then exits cleanly.
    RunUntilStopped,
    /// Broken source: exits with an error as soon as it starts.
    FailImmediately,
    /// Wedged encoder: ignores the stop request, only dies when killed.
    IgnoreStop,
    /// Missing binary: spawning itself fails.
    FailToSpawn,
}

#[derive(Default)]
pub struct MockStats {
    pub spawn_attempts: AtomicUsize,
    pub live: AtomicUsize,
    pub peak_live: AtomicUsize,
    pub stop_requests: AtomicUsize,
    pub kills: AtomicUsize,
}

impl MockStats {
    pub fn spawn_attempts(&self) -> usize {
        self.spawn_attempts.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn peak_live(&self) -> usize {
        self.peak_live.load(Ordering::SeqCst)
    }

    pub fn stop_requests(&self) -> usize {
        self.stop_requests.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

pub struct MockBackend {
    behavior: MockBehavior,
    stats: Arc<MockStats>,
}

impl MockBackend {
    pub fn new(behavior: MockBehavior) -> (Self, Arc<MockStats>) {
        let stats = Arc::new(MockStats::default());
        (
            Self {
                behavior,
                stats: stats.clone(),
            },
            stats,
        )
    }
}

impl CaptureBackend for MockBackend {
    type Child = MockChild;

    fn spawn(&self, _stream_url: &str, _output_path: &Path) -> anyhow::Result<MockChild> {
        self.stats.spawn_attempts.fetch_add(1, Ordering::SeqCst);

        if self.behavior == MockBehavior::FailToSpawn {
            bail!("mock spawn failure");
        }

        let live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak_live.fetch_max(live, Ordering::SeqCst);

        Ok(MockChild {
            behavior: self.behavior,
            stats: self.stats.clone(),
            stopped: Arc::new(Notify::new()),
            killed: Arc::new(Notify::new()),
            exited: false,
        })
    }
}

pub struct MockChild {
    behavior: MockBehavior,
    stats: Arc<MockStats>,
    stopped: Arc<Notify>,
    killed: Arc<Notify>,
    exited: bool,
}

impl MockChild {
    fn mark_exited(&mut self) {
        if !self.exited {
            self.exited = true;
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl CaptureChild for MockChild {
    fn request_stop(&mut self) {
        self.stats.stop_requests.fetch_add(1, Ordering::SeqCst);
        if self.behavior != MockBehavior::IgnoreStop {
            self.stopped.notify_one();
        }
    }

    fn start_kill(&mut self) -> anyhow::Result<()> {
        self.stats.kills.fetch_add(1, Ordering::SeqCst);
        self.killed.notify_one();
        Ok(())
    }

    fn wait(&mut self) -> impl Future<Output = anyhow::Result<CaptureOutcome>> + Send {
        async move {
            if self.exited {
                bail!("wait called on an exited mock child");
            }

            match self.behavior {
                MockBehavior::FailImmediately => {
                    self.mark_exited();
                    Ok(CaptureOutcome::Failed(Some(1)))
                }
                MockBehavior::RunUntilStopped => {
                    self.stopped.notified().await;
                    self.mark_exited();
                    Ok(CaptureOutcome::Finished)
                }
                MockBehavior::IgnoreStop => {
                    self.killed.notified().await;
                    self.mark_exited();
                    Ok(CaptureOutcome::Failed(None))
                }
                MockBehavior::FailToSpawn => unreachable!("never spawned"),
            }
        }
    }
}
