use regex::Regex;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{Error, IoContext, Result};
use crate::exclude::parse_ignore_spec;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// One directory under automatic snapshotting.
///
/// Both paths are canonical, and `repo_dir` is guaranteed to lie outside
/// `work_dir`: otherwise `git add --all` would stage the repository's own
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub name: String,
    pub work_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub ignore_patterns: Vec<String>,
    pub vcs_binary: PathBuf,
}

impl BackupTarget {
    /// Validate raw user input and build a target.
    ///
    /// Nothing on disk is touched besides resolving paths.
    pub fn resolve(
        name: &str,
        work_dir: &Path,
        repo_dir: &Path,
        ignore_spec: Option<&str>,
        vcs_binary: PathBuf,
    ) -> Result<Self> {
        validate_name(name)?;

        let work = resolve_path(work_dir)?;
        if !work.is_dir() {
            return Err(Error::config(format!(
                "work directory {} is not an existing directory",
                work.display()
            )));
        }
        let repo = resolve_path(repo_dir)?;
        if repo.exists() && !repo.is_dir() {
            return Err(Error::config(format!(
                "repository path {} exists and is not a directory",
                repo.display()
            )));
        }
        check_containment(&work, &repo)?;
        for p in [&work, &repo] {
            if p.to_str().is_none() {
                return Err(Error::config(format!("{} is not valid UTF-8", p.display())));
            }
        }

        Ok(Self {
            name: name.to_string(),
            work_dir: work,
            repo_dir: repo,
            ignore_patterns: ignore_spec.map(parse_ignore_spec).unwrap_or_default(),
            vcs_binary,
        })
    }

    pub fn git_dir(&self) -> PathBuf {
        self.repo_dir.join(".git")
    }
}

pub fn validate_name(name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::config(format!(
            "invalid name {name:?}: only letters, digits, '_' and '-' are allowed"
        )))
    }
}

/// Make `raw` absolute and canonical without requiring it to exist.
///
/// Existing components are resolved through `fs::canonicalize`, so symlinks
/// anywhere along the existing prefix are followed. The non-existent tail
/// is appended lexically, with `.` dropped and `..` popping a component.
pub fn resolve_path(raw: &Path) -> Result<PathBuf> {
    if raw.as_os_str().is_empty() {
        return Err(Error::config("empty path"));
    }
    let abs = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        let cwd = env::current_dir().at(".")?;
        cwd.join(raw)
    };

    let mut out = PathBuf::new();
    for comp in abs.components() {
        match comp {
            Component::Prefix(_) | Component::RootDir => out.push(comp.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => {
                out.push(part);
                match fs::canonicalize(&out) {
                    Ok(c) => out = c,
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e).at(&out),
                }
            }
        }
    }
    Ok(out)
}

/// Reject a repository that equals or lives inside the work tree.
pub fn check_containment(work: &Path, repo: &Path) -> Result<()> {
    if repo == work {
        return Err(Error::config(format!(
            "repository {} must not be the work directory itself",
            repo.display()
        )));
    }
    if repo.starts_with(work) {
        return Err(Error::config(format!(
            "repository {} must not live inside the work directory {}",
            repo.display(),
            work.display()
        )));
    }
    Ok(())
}
