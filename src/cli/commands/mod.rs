//! Command handlers.

pub mod action;
pub mod ingest;
pub mod policy;
pub mod start;
pub mod status;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::http::HttpRemediator;
use crate::adapters::sqlite::{
    SqliteActionRepository, SqliteMetricRepository, SqliteQueue, SqliteStore,
};
use crate::domain::models::WardenConfig;
use crate::domain::ports::SystemClock;
use crate::services::ControlPlane;

/// Open the shared database for offline commands (action, status, ingest).
/// The store is WAL-mode SQLite, so these commands can run next to a live
/// `warden start` process.
pub(crate) async fn open_database(config: &WardenConfig) -> Result<SqlitePool> {
    let store = SqliteStore::open(&config.database)
        .await
        .context("Failed to open database")?;
    Ok(store.pool())
}

/// Wire a control plane exactly as the daemon runs it: shared store, HTTP
/// remediator, system clock.
pub(crate) async fn build_control_plane(config: WardenConfig) -> Result<ControlPlane> {
    let store = SqliteStore::open(&config.database)
        .await
        .context("Failed to open database")?;
    let pool = store.pool();

    let remediator = HttpRemediator::new(
        config.remediator.url.clone(),
        Duration::from_secs(config.workers.execution_timeout_seconds),
    )
    .context("Failed to build remediator client")?;

    Ok(ControlPlane::new(
        config,
        Arc::new(SqliteMetricRepository::new(pool.clone())),
        Arc::new(SqliteActionRepository::new(pool.clone())),
        Arc::new(SqliteQueue::new(pool)),
        Arc::new(remediator),
        Arc::new(SystemClock::new()),
    ))
}

/// The daemon advertises itself through a pidfile next to the database so
/// `policy reload` can find it.
pub(crate) fn pidfile_path(config: &WardenConfig) -> PathBuf {
    Path::new(&config.database.path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("warden.pid")
}

/// Tell a running daemon to re-read its policy source. Returns the
/// signalled pid, or `None` when no daemon is advertised (or the pidfile is
/// stale).
#[cfg(unix)]
pub(crate) fn signal_daemon_reload(config: &WardenConfig) -> Result<Option<i32>> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pidfile = pidfile_path(config);
    let Ok(raw) = std::fs::read_to_string(&pidfile) else {
        return Ok(None);
    };
    let pid: i32 = raw
        .trim()
        .parse()
        .with_context(|| format!("malformed pidfile {}", pidfile.display()))?;

    match kill(Pid::from_raw(pid), Signal::SIGHUP) {
        Ok(()) => Ok(Some(pid)),
        // Stale pidfile left behind by a daemon that never cleaned up.
        Err(Errno::ESRCH) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("cannot signal daemon pid {pid}")),
    }
}

#[cfg(not(unix))]
pub(crate) fn signal_daemon_reload(_config: &WardenConfig) -> Result<Option<i32>> {
    Ok(None)
}
