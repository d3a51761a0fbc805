// src/main.rs

use anyhow::Context;
use log::{error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use camvault::capture::FfmpegBackend;
use camvault::config::Config;
use camvault::recorder::{Supervisor, SupervisorConfig};
use camvault::retention::RetentionMonitor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // ------------------------------------------------------------
    // Config
    // ------------------------------------------------------------
    let cfg_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".into());

    let cfg = match Config::load(&cfg_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("[camvault] config error: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("[camvault] loaded {}", cfg_path);

    // ------------------------------------------------------------
    // Supervisor + Retention
    // ------------------------------------------------------------
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let supervisor = start_supervisor(&cfg, shutdown_rx.clone());
    let retention = start_retention(&cfg, shutdown_rx);

    // ------------------------------------------------------------
    // Main loop
    // ------------------------------------------------------------
    info!("[camvault] running – Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    // ------------------------------------------------------------
    // Shutdown
    // ------------------------------------------------------------
    info!("[camvault] shutdown requested");
    let _ = shutdown_tx.send(true);

    if let Err(e) = supervisor.await {
        error!("[camvault] supervisor task failed: {}", e);
    }
    if let Err(e) = retention.await {
        error!("[camvault] retention task failed: {}", e);
    }

    info!("[camvault] shutdown complete");
    Ok(())
}

fn start_supervisor(cfg: &Config, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let supervisor = Supervisor::new(
        SupervisorConfig::from_config(cfg),
        FfmpegBackend::new(cfg.ffmpeg.clone()),
    );

    tokio::spawn(async move {
        if let Err(e) = supervisor.run(shutdown).await {
            error!("[supervisor] fatal: {:#}", e);
        }
    })
}

fn start_retention(cfg: &Config, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let monitor = RetentionMonitor::from_config(cfg);

    tokio::spawn(monitor.run(shutdown))
}
