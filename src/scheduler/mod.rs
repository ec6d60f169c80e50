//! Host scheduler integration.
//!
//! The provisioner picks one [`Scheduler`] by probing the host, then asks it
//! to register the agent wrapper. Every implementation must be an idempotent
//! upsert that leaves unrelated jobs alone.

mod crontab;
mod launchd;

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

use crate::error::{Error, Result};
use crate::paths::launch_agents_dir;

pub use crontab::Crontab;
pub use launchd::Launchd;

/// A periodic job: run `command` with no arguments every `interval_secs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: String,
    pub command: PathBuf,
    pub interval_secs: u64,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
}

/// What the scheduler now runs for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub description: String,
    /// Whether this registration changed the host's schedule.
    pub changed: bool,
}

pub trait Scheduler {
    /// Short identifier for messages, e.g. `"crontab"`.
    fn kind(&self) -> &'static str;

    /// Create or update the job for `job.name`.
    fn register(&self, job: &JobSpec) -> Result<ScheduleEntry>;
}

/// Pick the scheduler this host offers: launchd when `launchctl` is
/// available, otherwise the per-user crontab.
pub fn detect() -> Result<Box<dyn Scheduler>> {
    if let Ok(launchctl) = which::which("launchctl") {
        debug!("using launchd via {}", launchctl.display());
        return Ok(Box::new(Launchd::new(launchctl, launch_agents_dir()?)));
    }
    match which::which("crontab") {
        Ok(crontab) => {
            debug!("using crontab via {}", crontab.display());
            Ok(Box::new(Crontab::new(crontab)))
        }
        Err(_) => Err(Error::environment(
            "no supported scheduler found (need launchctl or crontab on PATH)",
        )),
    }
}

/// Run a scheduler tool, mapping a spawn failure to [`Error::Scheduler`].
fn tool(program: &Path, args: &[&std::ffi::OsStr]) -> Result<Output> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::scheduler(format!("cannot run {}: {}", program.display(), e)))
}

fn stderr_of(out: &Output) -> String {
    let s = String::from_utf8_lossy(&out.stderr).trim().to_string();
    if s.is_empty() {
        out.status.to_string()
    } else {
        s
    }
}
