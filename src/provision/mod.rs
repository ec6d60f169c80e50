//! One-time setup of a backup target.
//!
//! Steps run in a fixed order, each safe to repeat:
//! validate → repository → exclude list → agent wrapper → schedule.
//! The first failure aborts; earlier steps are left in place because
//! re-running provisioning converges on the same state.

mod target;
mod wrapper;

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::config::Settings;
use crate::error::{Error, IoContext, Result};
use crate::exclude;
use crate::git::{GitCli, RepositoryHandle, Vcs, ensure_identity, is_repository};
use crate::paths::Paths;
use crate::progress::Progress;
use crate::scheduler::{JobSpec, ScheduleEntry, Scheduler};

pub use target::{BackupTarget, check_containment, resolve_path, validate_name};
pub use wrapper::WrapperOutcome;

/// Raw provisioning input, as typed by the user.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub name: String,
    pub work_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub ignore: Option<String>,
    /// The `autosnap-agent` binary the wrapper execs.
    pub agent_bin: PathBuf,
    pub git: GitCli,
    pub settings: Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOutcome {
    Created,
    Reused,
}

#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub target: BackupTarget,
    pub repository: RepoOutcome,
    pub exclude_file: PathBuf,
    pub patterns_added: Vec<String>,
    pub wrapper: PathBuf,
    pub wrapper_outcome: WrapperOutcome,
    pub scheduler: &'static str,
    pub schedule: ScheduleEntry,
}

impl ProvisionReport {
    /// Human-readable summary printed by the CLI.
    pub fn summary(&self) -> String {
        let repo = match self.repository {
            RepoOutcome::Created => "created",
            RepoOutcome::Reused => "existing",
        };
        let patterns = match self.patterns_added.len() {
            0 => "no new patterns".to_string(),
            1 => "1 pattern added".to_string(),
            n => format!("{n} patterns added"),
        };
        let schedule = if self.schedule.changed {
            "registered"
        } else {
            "already registered"
        };

        let mut s = String::new();
        let _ = writeln!(s, "repository:   {} ({repo})", self.target.git_dir().display());
        let _ = writeln!(s, "work dir:     {}", self.target.work_dir.display());
        let _ = writeln!(s, "exclude file: {} ({patterns})", self.exclude_file.display());
        let _ = writeln!(
            s,
            "wrapper:      {} ({})",
            self.wrapper.display(),
            self.wrapper_outcome.as_str()
        );
        let _ = writeln!(
            s,
            "schedule:     [{}] {} ({schedule})",
            self.scheduler, self.schedule.description
        );
        s
    }
}

/// Run `f` as one visible provisioning step.
fn stage<T>(
    progress: &Progress,
    msg: &str,
    f: impl FnOnce() -> Result<(T, String)>,
) -> Result<T> {
    let step = progress.step(msg);
    match f() {
        Ok((v, detail)) => {
            step.done(detail);
            Ok(v)
        }
        Err(e) => {
            step.fail(&e);
            Err(e)
        }
    }
}

fn ensure_repository(git: &GitCli, handle: &RepositoryHandle) -> Result<RepoOutcome> {
    if is_repository(&handle.git_dir) {
        return Ok(RepoOutcome::Reused);
    }
    fs::create_dir_all(&handle.git_dir).at(&handle.git_dir)?;
    git.init(handle)?;
    if !is_repository(&handle.git_dir) {
        return Err(Error::vcs(
            "init",
            format!("no repository at {} after init", handle.git_dir.display()),
        ));
    }
    Ok(RepoOutcome::Created)
}

/// Provision one backup target.
pub fn provision(
    req: &ProvisionRequest,
    paths: &Paths,
    scheduler: &dyn Scheduler,
    progress: &Progress,
) -> Result<ProvisionReport> {
    let target = stage(progress, "validating input", || {
        let t = BackupTarget::resolve(
            &req.name,
            &req.work_dir,
            &req.repo_dir,
            req.ignore.as_deref(),
            req.git.binary().to_path_buf(),
        )?;
        Ok((t, String::new()))
    })?;
    let handle = RepositoryHandle::for_repo_dir(&target.repo_dir, &target.work_dir);

    let repository = stage(progress, "preparing repository", || {
        let outcome = ensure_repository(&req.git, &handle)?;
        if ensure_identity(&handle.git_dir)? {
            info!("no committer identity configured, using the autosnap default");
        }
        let detail = match outcome {
            RepoOutcome::Created => "initialized",
            RepoOutcome::Reused => "reused",
        };
        Ok((outcome, detail.to_string()))
    })?;

    let exclude_file = handle.exclude_file();
    let merged = stage(progress, "updating exclude list", || {
        let m = exclude::merge_into_file(&exclude_file, &target.name, &target.ignore_patterns)?;
        let detail = format!("{} added", m.added.len());
        Ok((m, detail))
    })?;

    let wrapper_path = paths.wrapper(&target.name);
    let error_log = paths.error_log(&target.name);
    let wrapper_outcome = stage(progress, "writing agent wrapper", || {
        fs::create_dir_all(&paths.logs).at(&paths.logs)?;
        let content = wrapper::render(&req.agent_bin, &target, &error_log, &req.settings)?;
        let outcome = wrapper::install(&content, &wrapper_path)?;
        Ok((outcome, outcome.as_str().to_string()))
    })?;

    let job = JobSpec {
        name: target.name.clone(),
        command: wrapper_path.clone(),
        interval_secs: req.settings.interval_secs,
        stdout_log: paths.stdout_log(&target.name),
        stderr_log: paths.stderr_log(&target.name),
    };
    let schedule = stage(
        progress,
        &format!("registering with {}", scheduler.kind()),
        || {
            let entry = scheduler.register(&job)?;
            let detail = if entry.changed { "added" } else { "unchanged" };
            Ok((entry, detail.to_string()))
        },
    )?;

    Ok(ProvisionReport {
        target,
        repository,
        exclude_file,
        patterns_added: merged.added,
        wrapper: wrapper_path,
        wrapper_outcome,
        scheduler: scheduler.kind(),
        schedule,
    })
}
