mod common;

use autosnap::agent::{self, AgentConfig};
use autosnap::git::{GitCli, RepositoryHandle, commit_count, head_paths};
use autosnap::scheduler::Crontab;
use autosnap::{Progress, RunOutcome, provision};
use common::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const AGENT: &str = env!("CARGO_BIN_EXE_autosnap-agent");

fn config(handle: RepositoryHandle, log: PathBuf) -> AgentConfig {
    AgentConfig {
        name: "docs".into(),
        handle,
        error_log: log,
        stale_after: Duration::from_secs(24 * 3600),
        message: "autocommit".into(),
        handle_signals: false,
    }
}

fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        sleep(Duration::from_millis(20));
    }
    false
}

/// A directory with a bare repository standing in as metadata, for runs
/// where `git` itself is faked.
fn fake_target(root: &Path) -> (PathBuf, PathBuf) {
    let work = root.join("work");
    fs::create_dir_all(&work).unwrap();
    let git_dir = root.join("backup/.git");
    git2::Repository::init_bare(&git_dir).unwrap();
    (work, git_dir)
}

fn agent_cmd(name: &str, work: &Path, git_dir: &Path, git: &Path, log: &Path) -> Command {
    let mut cmd = Command::new(AGENT);
    cmd.arg("--name")
        .arg(name)
        .arg("--work-dir")
        .arg(work)
        .arg("--git-dir")
        .arg(git_dir)
        .arg("--git")
        .arg(git)
        .arg("--log-file")
        .arg(log)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

#[test]
fn commit_captures_additions_and_deletions() {
    let Some(git) = real_git() else { return };
    let td = tempdir().unwrap();
    let work = td.path().join("work");
    fs::create_dir_all(work.join("sub")).unwrap();
    fs::write(work.join("keep.txt"), "keep").unwrap();
    fs::write(work.join("gone.txt"), "gone").unwrap();
    let handle = init_repo(&git, &td.path().join("backup"), &work);
    let cfg = config(handle.clone(), td.path().join("docs.error.log"));

    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Committed);
    assert_eq!(commit_count(&handle.git_dir).unwrap(), 1);
    assert_eq!(head_paths(&handle.git_dir).unwrap(), vec!["gone.txt", "keep.txt"]);

    fs::remove_file(work.join("gone.txt")).unwrap();
    fs::write(work.join("sub/new.txt"), "new").unwrap();
    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Committed);
    assert_eq!(commit_count(&handle.git_dir).unwrap(), 2);
    assert_eq!(head_paths(&handle.git_dir).unwrap(), vec!["keep.txt", "sub/new.txt"]);

    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Clean);
    assert_eq!(commit_count(&handle.git_dir).unwrap(), 2);
    assert!(!handle.lock_dir().exists());
    assert!(!cfg.error_log.exists());
}

#[test]
fn excluded_files_are_never_committed() {
    let Some(git) = real_git() else { return };
    let td = tempdir().unwrap();
    let work = td.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let repo = td.path().join("backup");
    let paths = test_paths(td.path());
    let sched = Crontab::new(fake_crontab(td.path()).0);
    let req = request("docs", &work, &repo, Some("*.tmp"), git.clone());
    let report = provision(&req, &paths, &sched, &Progress::hidden()).unwrap();
    let handle = RepositoryHandle::new(report.target.git_dir(), &report.target.work_dir);

    fs::write(work.join("scratch.tmp"), "x").unwrap();
    let cfg = config(handle.clone(), paths.error_log("docs"));
    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Clean);
    assert_eq!(commit_count(&handle.git_dir).unwrap(), 0);

    fs::write(work.join("notes.md"), "n").unwrap();
    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Committed);
    assert_eq!(head_paths(&handle.git_dir).unwrap(), vec!["notes.md"]);

    fs::write(work.join("scratch.tmp"), "changed").unwrap();
    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Clean);

    fs::write(work.join("scratch.tmp"), "changed again").unwrap();
    fs::write(work.join("notes.md"), "n2").unwrap();
    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Committed);
    assert_eq!(commit_count(&handle.git_dir).unwrap(), 2);
    assert_eq!(head_paths(&handle.git_dir).unwrap(), vec!["notes.md"]);
}

#[test]
fn empty_work_tree_produces_no_commit() {
    let Some(git) = real_git() else { return };
    let td = tempdir().unwrap();
    let work = td.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let handle = init_repo(&git, &td.path().join("backup"), &work);
    let cfg = config(handle.clone(), td.path().join("docs.error.log"));

    assert_eq!(agent::run_once(&cfg, &git).unwrap(), RunOutcome::Clean);
    assert_eq!(commit_count(&handle.git_dir).unwrap(), 0);
    assert!(!cfg.error_log.exists());
}

#[test]
fn wrapper_runs_without_any_environment() {
    let Some(git) = real_git() else { return };
    let td = tempdir().unwrap();
    let work = td.path().join("work");
    fs::create_dir_all(&work).unwrap();
    fs::write(work.join("a.txt"), "a").unwrap();
    let paths = test_paths(td.path());
    let sched = Crontab::new(fake_crontab(td.path()).0);
    let req = request("docs", &work, &td.path().join("backup"), None, git);
    let report = provision(&req, &paths, &sched, &Progress::hidden()).unwrap();

    let status = Command::new(&report.wrapper)
        .env_clear()
        .current_dir("/")
        .stdin(Stdio::null())
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(commit_count(&report.target.git_dir()).unwrap(), 1);
    assert!(!paths.error_log("docs").exists());
}

#[test]
fn failed_status_is_logged_and_exits_nonzero() {
    let td = tempdir().unwrap();
    let (work, git_dir) = fake_target(td.path());
    let git = script(
        &td.path().join("git"),
        "echo 'fatal: index file corrupt' >&2\nexit 128",
    );
    let log = td.path().join("logs/docs.error.log");

    let status = agent_cmd("docs", &work, &git_dir, &git, &log).status().unwrap();
    assert_eq!(status.code(), Some(1));
    let logged = fs::read_to_string(&log).unwrap();
    assert_eq!(logged.lines().count(), 1);
    assert!(logged.starts_with('['));
    assert!(logged.contains("index file corrupt"));
    assert!(!git_dir.join("autosnap.lock").exists());
}

#[test]
fn missing_repository_is_logged_without_repair() {
    let td = tempdir().unwrap();
    let work = td.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let git_dir = td.path().join("backup/.git");
    let git = script(&td.path().join("git"), "exit 0");
    let log = td.path().join("docs.error.log");

    let status = agent_cmd("docs", &work, &git_dir, &git, &log).status().unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(fs::read_to_string(&log).unwrap().contains("no valid repository"));
    assert!(!git_dir.exists());
}

#[test]
fn held_lock_makes_run_exit_quietly() {
    let td = tempdir().unwrap();
    let (work, git_dir) = fake_target(td.path());
    let calls = td.path().join("git.calls");
    let git = script(
        &td.path().join("git"),
        &format!("echo \"$@\" >> '{}'\nexit 1", calls.display()),
    );
    let lock = git_dir.join("autosnap.lock");
    fs::create_dir(&lock).unwrap();
    let log = td.path().join("docs.error.log");

    let status = agent_cmd("docs", &work, &git_dir, &git, &log).status().unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(lock.is_dir());
    assert!(!log.exists());
    assert!(!calls.exists());
}

#[test]
fn stale_lock_is_reclaimed() {
    let td = tempdir().unwrap();
    let (work, git_dir) = fake_target(td.path());
    let git = script(&td.path().join("git"), "exit 0");
    let lock = git_dir.join("autosnap.lock");
    fs::create_dir(&lock).unwrap();
    sleep(Duration::from_millis(50));
    let log = td.path().join("docs.error.log");

    let status = agent_cmd("docs", &work, &git_dir, &git, &log)
        .args(["--stale-after", "0"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(0));
    assert!(!lock.exists());
    assert!(!log.exists());
}

#[test]
fn sigterm_releases_the_lock() {
    let td = tempdir().unwrap();
    let (work, git_dir) = fake_target(td.path());
    let marker = td.path().join("status.started");
    let git = script(
        &td.path().join("git"),
        &format!("touch '{}'\nexec sleep 10", marker.display()),
    );
    let lock = git_dir.join("autosnap.lock");
    let log = td.path().join("docs.error.log");

    let mut child = agent_cmd("docs", &work, &git_dir, &git, &log).spawn().unwrap();
    assert!(wait_for(|| marker.exists() && lock.is_dir()), "agent never reached status");

    let killed = Command::new("kill")
        .arg("-TERM")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(killed.success());

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(128 + 15));
    assert!(!lock.exists());

    // The next tick proceeds normally.
    let clean = script(&td.path().join("git-clean"), "exit 0");
    let status = agent_cmd("docs", &work, &git_dir, &clean, &log).status().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn targets_lock_independently() {
    let td = tempdir().unwrap();
    let (work_a, git_a) = fake_target(&td.path().join("a"));
    let (work_b, git_b) = fake_target(&td.path().join("b"));
    let git = script(&td.path().join("git"), "exit 0");
    fs::create_dir(git_a.join("autosnap.lock")).unwrap();

    let ran = td.path().join("b.ran");
    let git_b_bin = script(
        &td.path().join("git-b"),
        &format!("touch '{}'\nexit 0", ran.display()),
    );
    let log = td.path().join("x.error.log");
    assert!(agent_cmd("a", &work_a, &git_a, &git, &log).status().unwrap().success());
    assert!(agent_cmd("b", &work_b, &git_b, &git_b_bin, &log).status().unwrap().success());
    assert!(ran.exists());
    assert!(git_a.join("autosnap.lock").is_dir());
    assert!(!git_b.join("autosnap.lock").exists());
}

#[test]
fn failing_git_binary_path_is_a_logged_failure() {
    let td = tempdir().unwrap();
    let (work, git_dir) = fake_target(td.path());
    let log = td.path().join("docs.error.log");
    let missing = GitCli::new(td.path().join("no-such-git"));

    let status = agent_cmd("docs", &work, &git_dir, missing.binary(), &log)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(log.exists());
    assert!(!git_dir.join("autosnap.lock").exists());
}
