#![allow(dead_code)]

use autosnap::git::{GitCli, RepositoryHandle, Vcs, ensure_identity};
use autosnap::{Paths, ProvisionRequest, Settings};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Real git, when the host has one. Tests that need it return early
/// otherwise.
pub fn real_git() -> Option<GitCli> {
    GitCli::locate().ok()
}

pub fn script(path: &Path, body: &str) -> PathBuf {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// A `crontab` stand-in keeping its table in `<dir>/crontab.table`.
pub fn fake_crontab(dir: &Path) -> (PathBuf, PathBuf) {
    let table = dir.join("crontab.table");
    let body = format!(
        r#"TABLE='{}'
if [ "$1" = "-l" ]; then
  if [ -f "$TABLE" ]; then cat "$TABLE"; else echo "no crontab for tester" >&2; exit 1; fi
else
  cp "$1" "$TABLE"
fi"#,
        table.display()
    );
    (script(&dir.join("crontab"), &body), table)
}

/// A `launchctl` stand-in appending each invocation to `<dir>/launchctl.calls`.
pub fn fake_launchctl(dir: &Path) -> (PathBuf, PathBuf) {
    let calls = dir.join("launchctl.calls");
    let body = format!(
        r#"echo "$1" >> '{}'
[ "$1" = "unload" ] && exit 1
exit 0"#,
        calls.display()
    );
    (script(&dir.join("launchctl"), &body), calls)
}

pub fn test_paths(root: &Path) -> Paths {
    Paths {
        bin: root.join("share/autosnap/bin"),
        logs: root.join("share/autosnap/logs"),
        config: root.join("config/autosnap/config.toml"),
    }
}

pub fn request(name: &str, work: &Path, repo: &Path, ignore: Option<&str>, git: GitCli) -> ProvisionRequest {
    ProvisionRequest {
        name: name.to_string(),
        work_dir: work.to_path_buf(),
        repo_dir: repo.to_path_buf(),
        ignore: ignore.map(str::to_string),
        agent_bin: PathBuf::from(env!("CARGO_BIN_EXE_autosnap-agent")),
        git,
        settings: Settings::default(),
    }
}

/// Initialize a detached repository the way provisioning does.
pub fn init_repo(git: &GitCli, repo: &Path, work: &Path) -> RepositoryHandle {
    let handle = RepositoryHandle::for_repo_dir(repo, work);
    fs::create_dir_all(&handle.git_dir).unwrap();
    git.init(&handle).unwrap();
    ensure_identity(&handle.git_dir).unwrap();
    handle
}

/// Everything under `dir`, relative and sorted.
pub fn tree(dir: &Path) -> Vec<String> {
    fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
        if let Ok(rd) = fs::read_dir(dir) {
            for e in rd.flatten() {
                let p = e.path();
                out.push(p.strip_prefix(base).unwrap().display().to_string());
                if p.is_dir() {
                    walk(base, &p, out);
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}
