//! `warden start`: run the control plane until interrupted.
//!
//! SIGHUP reloads the configured policy source transactionally; Ctrl-C
//! drains the workers and exits. The daemon advertises its pid next to the
//! database so `warden policy reload` can reach it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::models::WardenConfig;
use crate::infrastructure::logging;
use crate::services::ControlPlane;

pub async fn handle_start(config: WardenConfig, policies: Option<PathBuf>) -> Result<()> {
    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    let policy_path = policies.or_else(|| config.policy_file.clone().map(PathBuf::from));
    let pidfile = super::pidfile_path(&config);
    let plane = super::build_control_plane(config).await?;

    if let Some(ref path) = policy_path {
        let loaded = plane
            .reload_policies_from_path(path)
            .with_context(|| format!("Failed to load policies from {}", path.display()))?;
        info!(policies = loaded, path = %path.display(), "policy registry loaded");
    }

    plane.start();
    if let Err(err) = std::fs::write(&pidfile, std::process::id().to_string()) {
        warn!(
            %err,
            pidfile = %pidfile.display(),
            "cannot write pidfile; `policy reload` will not find this daemon"
        );
    }
    info!("warden control plane running; press Ctrl-C to stop");

    wait_for_shutdown(&plane, policy_path.as_deref()).await?;

    let _ = std::fs::remove_file(&pidfile);
    plane.shutdown().await;
    Ok(())
}

/// Block until Ctrl-C, servicing SIGHUP policy reloads in the meantime. A
/// rejected reload keeps the current registry.
#[cfg(unix)]
async fn wait_for_shutdown(plane: &ControlPlane, policy_path: Option<&Path>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for shutdown signal")?;
                return Ok(());
            }
            _ = hangup.recv() => match policy_path {
                Some(path) => match plane.reload_policies_from_path(path) {
                    Ok(count) => {
                        info!(policies = count, path = %path.display(), "policy registry reloaded");
                    }
                    Err(err) => {
                        warn!(%err, "policy reload rejected; keeping current registry");
                    }
                },
                None => warn!("reload signal received but no policy file is configured"),
            },
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_plane: &ControlPlane, _policy_path: Option<&Path>) -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    Ok(())
}
