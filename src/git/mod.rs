//! Git integration layer.
//!
//! Two backends live here. [`GitCli`] drives the four operations the tool
//! relies on (`init`, `status`, `add`, `commit`) through a git binary and
//! judges them by exit status and raw diagnostics only. `git2_backend`
//! inspects repository metadata in-process: validity checks, committer
//! identity, and history queries.
//!
//! Other modules go through [`Vcs`] and the re-exports below rather than
//! depending on either backend directly.

mod cli;
mod git2_backend;

use std::path::PathBuf;

use crate::error::Result;

pub use cli::GitCli;
pub use git2_backend::{commit_count, ensure_identity, head_paths, is_repository};

/// A metadata directory paired with the work tree it snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub git_dir: PathBuf,
    pub work_tree: PathBuf,
}

impl RepositoryHandle {
    pub fn new(git_dir: impl Into<PathBuf>, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            work_tree: work_tree.into(),
        }
    }

    /// Handle for a repository rooted at `repo_dir` (metadata in `repo_dir/.git`).
    pub fn for_repo_dir(repo_dir: impl Into<PathBuf>, work_tree: impl Into<PathBuf>) -> Self {
        Self::new(repo_dir.into().join(".git"), work_tree)
    }

    pub fn exclude_file(&self) -> PathBuf {
        self.git_dir.join("info").join("exclude")
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.git_dir.join("autosnap.lock")
    }
}

/// The version-control operations autosnap needs, and nothing more.
pub trait Vcs {
    /// Create metadata at `handle.git_dir` bound to `handle.work_tree`.
    fn init(&self, handle: &RepositoryHandle) -> Result<()>;

    /// Machine-readable working-tree differences; empty when clean.
    fn status(&self, handle: &RepositoryHandle) -> Result<String>;

    /// Stage every difference, including deletions, honoring the exclude list.
    fn add_all(&self, handle: &RepositoryHandle) -> Result<()>;

    fn commit(&self, handle: &RepositoryHandle, message: &str) -> Result<()>;
}
