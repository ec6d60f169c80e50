use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use super::BackupTarget;
use crate::config::Settings;
use crate::error::{Error, IoContext, Result};
use crate::shell::quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperOutcome {
    Created,
    Updated,
    Unchanged,
}

impl WrapperOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

fn utf8(p: &Path) -> Result<&str> {
    p.to_str()
        .ok_or_else(|| Error::config(format!("{} is not valid UTF-8", p.display())))
}

/// Render the `/bin/sh` wrapper the scheduler invokes.
///
/// Every parameter of the run is spelled out as a quoted argument, so the
/// agent needs neither `PATH` nor any other variable from the scheduler's
/// environment.
pub fn render(
    agent_bin: &Path,
    target: &BackupTarget,
    error_log: &Path,
    settings: &Settings,
) -> Result<String> {
    let git_dir = target.git_dir();
    let args = [
        ("--name", quote(&target.name)),
        ("--work-dir", quote(utf8(&target.work_dir)?)),
        ("--git-dir", quote(utf8(&git_dir)?)),
        ("--git", quote(utf8(&target.vcs_binary)?)),
        ("--log-file", quote(utf8(error_log)?)),
        ("--stale-after", settings.stale_after().as_secs().to_string()),
        ("--message", quote(&settings.commit_message)),
    ];

    let mut s = String::from("#!/bin/sh\n");
    s.push_str(&format!(
        "# autosnap agent for {}; generated, re-run autosnap to change it.\n",
        target.name
    ));
    s.push_str(&format!("exec {}", quote(utf8(agent_bin)?)));
    for (flag, value) in args {
        s.push_str(&format!(" \\\n  {flag} {value}"));
    }
    s.push('\n');
    Ok(s)
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn sha256_file(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(b) => Ok(Some(sha256_hex(&b))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).at(path),
    }
}

fn restrict(path: &Path) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(0o700)).at(path)
}

/// Install `content` at `dst` with owner-only permissions.
///
/// The new file is written next to `dst` and renamed over it, so the
/// scheduler never sees a half-written wrapper. An existing wrapper with
/// identical content is left in place.
pub fn install(content: &str, dst: &Path) -> Result<WrapperOutcome> {
    let dir = dst
        .parent()
        .ok_or_else(|| Error::config(format!("{} has no parent directory", dst.display())))?;
    fs::create_dir_all(dir).at(dir)?;

    let old = sha256_file(dst)?;
    if old.as_deref() == Some(sha256_hex(content.as_bytes()).as_str()) {
        restrict(dst)?;
        return Ok(WrapperOutcome::Unchanged);
    }

    let mut tmp = tempfile::Builder::new()
        .prefix(".autosnap-")
        .tempfile_in(dir)
        .at(dir)?;
    tmp.write_all(content.as_bytes()).at(tmp.path())?;
    tmp.as_file().sync_all().at(tmp.path())?;
    restrict(tmp.path())?;
    tmp.persist(dst).map_err(|e| e.error).at(dst)?;

    Ok(if old.is_some() {
        WrapperOutcome::Updated
    } else {
        WrapperOutcome::Created
    })
}
