//! Node health monitoring agent.
//!
//! Monitors watch host signal sources (the kernel ring buffer, journal units, log files and
//! periodic procfs snapshots) and turn what they see into [`monitor::Condition`]s. Plugins
//! bundle monitors and are collected in the process-wide [`registry`]; the
//! [`manager::MonitorManager`] feeds every registered monitor and exports its conditions.
use tokio_util::sync::CancellationToken;

use config::Config;
use manager::{LogExporter, MonitorManager};

pub mod api;
pub mod config;
pub mod environment;
pub mod error;
pub mod fsutil;
pub mod handler;
pub mod manager;
pub mod monitor;
pub mod monitors;
pub mod procfs;
pub mod registry;
pub mod resource;

/// Runs the agent until SIGINT or SIGTERM.
///
/// # Errors
///
/// Fails on invalid configuration, on a monitor whose subscriptions cannot be satisfied, and
/// if the status API cannot be served.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    monitors::register_builtin_plugins(&config.rootfs);

    let token = CancellationToken::new();
    let exporter = LogExporter::new();
    let stats = exporter.stats();
    let manager = MonitorManager::new(config.rootfs.clone(), exporter);
    for monitor in registry::global().all_monitors() {
        manager.register_monitor(monitor.as_ref(), token.child_token())?;
    }
    log::debug!(
        "registered {} plugin(s) observing {} resource(s)",
        registry::global().len(),
        manager.observer_count()
    );

    let api = api::APIServer::new(api::ApiState::new(stats, registry::global()));
    let api = tokio::spawn(api.listen(config.listen_addr, token.clone()));
    let manager = tokio::spawn(manager.start(token.clone()));

    shutdown_signal().await?;
    log::info!("shutting down");
    token.cancel();

    manager.await?;
    api.await??;
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}
