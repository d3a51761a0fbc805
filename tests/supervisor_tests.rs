use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::watch;

use camvault::recorder::{Supervisor, SupervisorConfig};
use camvault::testing::mocks::{MockBackend, MockBehavior};

fn test_cfg(base: &Path) -> SupervisorConfig {
    SupervisorConfig {
        stream_url: "rtsp://cam.test/stream1".to_string(),
        base_dir: base.to_path_buf(),
        segment_duration: Duration::from_secs(120),
        restart_delay: Duration::from_millis(50),
        stop_grace: Duration::from_secs(10),
        container_ext: "mkv".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn rotation_creates_exactly_one_session_per_interval() -> anyhow::Result<()> {
    let base = TempDir::new()?;
    let (backend, stats) = MockBackend::new(MockBehavior::RunUntilStopped);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(Supervisor::new(test_cfg(base.path()), backend).run(shutdown_rx));

    // 3 full rotation intervals plus slack for the restart delays
    tokio::time::sleep(Duration::from_secs(3 * 120 + 60)).await;

    assert_eq!(stats.spawn_attempts(), 4); // initial session + one per rotation
    assert_eq!(stats.peak_live(), 1);

    shutdown_tx.send(true)?;
    handle.await??;

    assert_eq!(stats.live(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failing_capture_restarts_unconditionally() -> anyhow::Result<()> {
    let base = TempDir::new()?;
    let (backend, stats) = MockBackend::new(MockBehavior::FailImmediately);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(Supervisor::new(test_cfg(base.path()), backend).run(shutdown_rx));

    // Every session dies instantly; one restart per 50ms delay.
    tokio::time::sleep(Duration::from_secs(2)).await;

    let spawned = stats.spawn_attempts();
    assert!(spawned >= 30, "expected steady restarts, got {}", spawned);
    assert_eq!(stats.peak_live(), 1);

    shutdown_tx.send(true)?;
    handle.await??;

    assert_eq!(stats.live(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn spawn_failure_is_retried_forever() -> anyhow::Result<()> {
    let base = TempDir::new()?;
    let (backend, stats) = MockBackend::new(MockBehavior::FailToSpawn);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(Supervisor::new(test_cfg(base.path()), backend).run(shutdown_rx));

    tokio::time::sleep(Duration::from_secs(1)).await;

    let attempts = stats.spawn_attempts();
    assert!(attempts >= 10, "expected steady retries, got {}", attempts);
    assert_eq!(stats.live(), 0);

    shutdown_tx.send(true)?;
    handle.await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn ignored_stop_request_escalates_to_kill() -> anyhow::Result<()> {
    let base = TempDir::new()?;
    let (backend, stats) = MockBackend::new(MockBehavior::IgnoreStop);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut cfg = test_cfg(base.path());
    cfg.segment_duration = Duration::from_secs(5);
    cfg.stop_grace = Duration::from_secs(2);

    let handle = tokio::spawn(Supervisor::new(cfg, backend).run(shutdown_rx));

    // rotation at 5s, grace expires at 7s, replacement right after
    tokio::time::sleep(Duration::from_secs(8)).await;

    assert!(stats.kills() >= 1, "expected a kill escalation");
    assert!(stats.spawn_attempts() >= 2, "expected a replacement session");
    assert_eq!(stats.peak_live(), 1);

    shutdown_tx.send(true)?;
    handle.await??;

    assert_eq!(stats.live(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_session_without_replacement() -> anyhow::Result<()> {
    let base = TempDir::new()?;
    let (backend, stats) = MockBackend::new(MockBehavior::RunUntilStopped);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(Supervisor::new(test_cfg(base.path()), backend).run(shutdown_rx));

    // well within the first segment
    tokio::time::sleep(Duration::from_secs(10)).await;

    shutdown_tx.send(true)?;
    handle.await??;

    assert_eq!(stats.spawn_attempts(), 1);
    assert_eq!(stats.stop_requests(), 1);
    assert_eq!(stats.live(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sessions_write_into_a_day_folder_under_base() -> anyhow::Result<()> {
    let base = TempDir::new()?;
    let (backend, _stats) = MockBackend::new(MockBehavior::RunUntilStopped);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(Supervisor::new(test_cfg(base.path()), backend).run(shutdown_rx));
    tokio::time::sleep(Duration::from_secs(1)).await;

    shutdown_tx.send(true)?;
    handle.await??;

    let day_dirs: Vec<_> = std::fs::read_dir(base.path())?
        .map(|entry| entry.unwrap())
        .collect();
    assert_eq!(day_dirs.len(), 1);
    assert!(day_dirs[0].file_type()?.is_dir());
    Ok(())
}
