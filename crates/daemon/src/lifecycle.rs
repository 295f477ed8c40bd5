// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use suds_core::{ConfigError, MachineState, Settings, SystemClock};
use suds_engine::Runtime;
use suds_storage::{MaterializedState, Wal, WalJournal};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Runtime with the production clock
pub type DaemonRuntime = Runtime<SystemClock>;

/// Daemon path layout
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding everything below
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the WAL file
    pub wal_path: PathBuf,
    /// Optional settings file; defaults apply when absent
    pub settings_path: PathBuf,
}

impl Config {
    pub fn for_state_dir(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
            socket_path: state_dir.join("sudsd.sock"),
            lock_path: state_dir.join("sudsd.pid"),
            log_path: state_dir.join("sudsd.log"),
            wal_path: state_dir.join("wal").join("events.wal"),
            settings_path: state_dir.join("suds.toml"),
        }
    }

    /// `$SUDS_STATE_DIR`, else `$XDG_STATE_HOME/suds`, else `~/.local/state/suds`
    pub fn from_env() -> Result<Self, LifecycleError> {
        Ok(Self::for_state_dir(&default_state_dir()?))
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub listener: UnixListener,
    pub runtime: Arc<DaemonRuntime>,
    pub settings: Settings,
}

impl DaemonState {
    /// Shutdown the daemon gracefully
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("shutting down daemon");

        // Let queued broadcasts go out before the process exits
        self.runtime.hub().flush().await;

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("failed to remove PID file: {}", e);
            }
        }

        info!("daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("settings error: {0}")]
    Settings(#[from] ConfigError),

    #[error("WAL error: {0}")]
    Wal(#[from] suds_storage::WalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // A lock failure means another daemon owns these files
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock first so a second daemon fails before touching anything
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Settings before the socket: a bad file means no connections at all
    let settings = Settings::load(&config.settings_path)?;

    let ops = Wal::replay(&config.wal_path)?;
    let state = MaterializedState::replay(settings.machines_per_class, &ops);
    let wal = Wal::open(&config.wal_path)?;

    info!(
        ops = ops.len(),
        machines = state.machines.len(),
        faults = state.faults.values().map(Vec::len).sum::<usize>(),
        "recovered state from WAL"
    );
    report_recovered(&state);

    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let runtime = Runtime::new(
        state,
        Arc::new(WalJournal::new(wal)),
        settings.clone(),
        SystemClock,
    );

    info!(state_dir = %config.state_dir.display(), "daemon started");

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        runtime: Arc::new(runtime),
        settings,
    })
}

fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

/// Cycles do not advance while the daemon is down; surface what was left running
fn report_recovered(state: &MaterializedState) {
    for machine in state.machines.values() {
        match machine.state {
            MachineState::InUse => warn!(
                resource = %machine.resource,
                owner = ?machine.owner_id,
                "machine was in use at last shutdown"
            ),
            MachineState::Disabled => info!(resource = %machine.resource, "machine is disabled"),
            MachineState::Available | MachineState::Completed => {}
        }
    }
}

fn default_state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("SUDS_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("suds"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/suds"))
}
