//! The recurring agent: one backup attempt per scheduler tick.
//!
//! A run is strictly sequential and stops at the first failure:
//! preflight → lock → status → add + commit → release. Failures are written
//! to the target's error log and reported through the exit status only;
//! the next tick is the retry.

mod errlog;
mod lock;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::git::{RepositoryHandle, Vcs, is_repository};

pub use errlog::ErrorLog;
pub use lock::{Acquire, LockGuard, SignalWatch, acquire};

/// Everything one run needs, fully resolved at provisioning time.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub handle: RepositoryHandle,
    pub error_log: PathBuf,
    pub stale_after: Duration,
    pub message: String,
    /// Release the lock from SIGINT/SIGTERM/SIGHUP. Only the agent binary
    /// turns this on; it takes over the process's signal disposition.
    pub handle_signals: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Committed,
    /// Work tree matches the last snapshot.
    Clean,
    /// Another instance holds the lock.
    Busy,
}

fn preflight(handle: &RepositoryHandle) -> Result<()> {
    if !is_repository(&handle.git_dir) {
        return Err(Error::environment(format!(
            "no valid repository at {}",
            handle.git_dir.display()
        )));
    }
    if !handle.work_tree.is_dir() {
        return Err(Error::environment(format!(
            "work directory {} does not exist",
            handle.work_tree.display()
        )));
    }
    Ok(())
}

/// Perform one backup attempt.
pub fn run_once(cfg: &AgentConfig, vcs: &dyn Vcs) -> Result<RunOutcome> {
    preflight(&cfg.handle)?;

    let watch = if cfg.handle_signals {
        Some(SignalWatch::install()?)
    } else {
        None
    };
    let mut guard = match acquire(&cfg.handle.lock_dir(), cfg.stale_after)? {
        Acquire::Acquired(g) => g,
        Acquire::Busy => {
            debug!("{}: lock held by another run", cfg.name);
            return Ok(RunOutcome::Busy);
        }
    };
    if let Some(watch) = watch {
        guard.release_on_signal(watch);
    }

    let status = vcs.status(&cfg.handle)?;
    if status.trim().is_empty() {
        debug!("{}: nothing to commit", cfg.name);
        return Ok(RunOutcome::Clean);
    }

    vcs.add_all(&cfg.handle)?;
    vcs.commit(&cfg.handle, &cfg.message)?;
    info!("{}: committed {} change(s)", cfg.name, status.lines().count());

    drop(guard);
    Ok(RunOutcome::Committed)
}

/// Run once and translate the result into an exit status, logging any
/// failure to the target's error log.
pub fn run(cfg: &AgentConfig, vcs: &dyn Vcs) -> ExitCode {
    match run_once(cfg, vcs) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            let msg = format!("{}: {}", cfg.name, e);
            error!("{msg}");
            if let Err(log_err) = ErrorLog::new(&cfg.error_log).append(&msg) {
                error!("cannot write {}: {}", cfg.error_log.display(), log_err);
            }
            ExitCode::FAILURE
        }
    }
}
