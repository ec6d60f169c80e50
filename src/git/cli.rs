use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

use super::{RepositoryHandle, Vcs};
use crate::error::{Error, Result};

/// [`Vcs`] implementation that shells out to a git binary.
///
/// The binary path is fixed when the value is built so that a run under a
/// scheduler with an empty `PATH` behaves exactly like the provisioning run.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
}

impl GitCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Resolve `git` on `PATH`.
    pub fn locate() -> Result<Self> {
        let binary = which::which("git")
            .map_err(|e| Error::environment(format!("git not found on PATH: {e}")))?;
        Ok(Self::new(binary))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, op: &'static str, handle: &RepositoryHandle, args: &[&str]) -> Result<String> {
        debug!(?args, git_dir = %handle.git_dir.display(), "git {op}");
        let out = Command::new(&self.binary)
            .arg("--git-dir")
            .arg(&handle.git_dir)
            .arg("--work-tree")
            .arg(&handle.work_tree)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::vcs(op, format!("cannot run {}: {}", self.binary.display(), e)))?;
        if out.status.success() {
            Ok(String::from_utf8_lossy(&out.stdout).into_owned())
        } else {
            Err(Error::vcs(op, diagnostic(&out)))
        }
    }
}

/// Raw diagnostic of a failed git call: stderr, else stdout, else the status.
fn diagnostic(out: &Output) -> String {
    let stderr = String::from_utf8_lossy(&out.stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim().to_string();
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    if !stdout.trim().is_empty() {
        return stdout.trim().to_string();
    }
    out.status.to_string()
}

impl Vcs for GitCli {
    fn init(&self, handle: &RepositoryHandle) -> Result<()> {
        self.run("init", handle, &["init", "--quiet"]).map(drop)
    }

    fn status(&self, handle: &RepositoryHandle) -> Result<String> {
        self.run(
            "status",
            handle,
            &["status", "--porcelain", "--untracked-files=all"],
        )
    }

    fn add_all(&self, handle: &RepositoryHandle) -> Result<()> {
        self.run("add", handle, &["add", "--all"]).map(drop)
    }

    fn commit(&self, handle: &RepositoryHandle, message: &str) -> Result<()> {
        self.run("commit", handle, &["commit", "--quiet", "-m", message])
            .map(drop)
    }
}
