use git2::{Config, ConfigLevel, ErrorCode, Repository, RepositoryOpenFlags};
use std::ffi::OsStr;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

const DEFAULT_NAME: &str = "autosnap";
const DEFAULT_EMAIL: &str = "autosnap@localhost";

/// Open the repository whose metadata lives exactly at `git_dir`.
///
/// No upward search is performed, so a directory nested in some other
/// repository is never mistaken for a valid one.
pub fn open_metadata(git_dir: &Path) -> Result<Repository> {
    let repo = Repository::open_ext(git_dir, RepositoryOpenFlags::NO_SEARCH, &[] as &[&OsStr])?;
    Ok(repo)
}

/// Whether `git_dir` holds a repository structure git can open.
pub fn is_repository(git_dir: &Path) -> bool {
    git_dir.is_dir() && open_metadata(git_dir).is_ok()
}

fn config_value(config: &Config, key: &str) -> Result<Option<String>> {
    match config.get_string(key) {
        Ok(v) if !v.trim().is_empty() => Ok(Some(v)),
        Ok(_) => Ok(None),
        Err(err) if err.code() == ErrorCode::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Make sure unattended commits have a committer identity.
///
/// The identity is read from the repository's own configuration only:
/// a scheduled run may have no `HOME`, so a global identity cannot be relied
/// on. Missing keys get a repository-local default; keys already set are
/// left alone. Returns `true` when something was written.
pub fn ensure_identity(git_dir: &Path) -> Result<bool> {
    let repo = open_metadata(git_dir)?;
    let mut local = repo.config()?.open_level(ConfigLevel::Local)?;
    let name = config_value(&local, "user.name")?;
    let email = config_value(&local, "user.email")?;
    if name.is_some() && email.is_some() {
        return Ok(false);
    }

    if name.is_none() {
        local.set_str("user.name", DEFAULT_NAME)?;
    }
    if email.is_none() {
        local.set_str("user.email", DEFAULT_EMAIL)?;
    }
    debug!("wrote default committer identity to {}", git_dir.display());
    Ok(true)
}

/// Number of commits reachable from HEAD; zero for an unborn branch.
pub fn commit_count(git_dir: &Path) -> Result<usize> {
    let repo = open_metadata(git_dir)?;
    let head = match repo.head() {
        Ok(h) => h,
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };
    let mut walk = repo.revwalk()?;
    walk.push(head.peel_to_commit()?.id())?;
    Ok(walk.count())
}

/// Paths recorded in the tree of the HEAD commit, sorted.
pub fn head_paths(git_dir: &Path) -> Result<Vec<String>> {
    let repo = open_metadata(git_dir)?;
    let tree = repo.head()?.peel_to_tree()?;
    let mut out = Vec::new();
    tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(git2::ObjectType::Blob)
            && let Some(name) = entry.name()
        {
            out.push(format!("{root}{name}"));
        }
        git2::TreeWalkResult::Ok
    })?;
    out.sort();
    Ok(out)
}
