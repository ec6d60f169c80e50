use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{JobSpec, ScheduleEntry, Scheduler, stderr_of, tool};
use crate::error::{Error, IoContext, Result};
use crate::shell::quote;

/// Table-based fallback: one hourly line in the user's crontab.
#[derive(Debug, Clone)]
pub struct Crontab {
    crontab: PathBuf,
}

impl Crontab {
    pub fn new(crontab: impl Into<PathBuf>) -> Self {
        Self {
            crontab: crontab.into(),
        }
    }

    /// Current table. A user without a crontab has an empty one.
    fn list(&self) -> Result<String> {
        let out = tool(&self.crontab, &[OsStr::new("-l")])?;
        if out.status.success() {
            return Ok(String::from_utf8_lossy(&out.stdout).into_owned());
        }
        let err = stderr_of(&out);
        if err.to_ascii_lowercase().contains("no crontab") {
            Ok(String::new())
        } else {
            Err(Error::scheduler(format!("crontab -l failed: {err}")))
        }
    }

    fn install(&self, table: &str) -> Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix("autosnap-crontab-")
            .tempfile()
            .at(std::env::temp_dir())?;
        tmp.write_all(table.as_bytes()).at(tmp.path())?;
        tmp.flush().at(tmp.path())?;

        let out = tool(&self.crontab, &[tmp.path().as_os_str()])?;
        if out.status.success() {
            Ok(())
        } else {
            Err(Error::scheduler(format!(
                "installing crontab failed: {}",
                stderr_of(&out)
            )))
        }
    }
}

pub fn entry_line(command: &Path) -> String {
    format!("0 * * * * {}", quote(&command.to_string_lossy()))
}

/// Whether `line` mentions `needle` as a whole word: bounded on both sides
/// by the line edge, whitespace or a quote. `/bin/autosnap-docs` must not
/// match inside `/bin/autosnap-docs2`.
fn mentions(line: &str, needle: &str) -> bool {
    let is_boundary =
        |c: Option<char>| c.is_none_or(|c| c.is_whitespace() || c == '\'' || c == '"');
    line.match_indices(needle).any(|(at, m)| {
        is_boundary(line[..at].chars().next_back())
            && is_boundary(line[at + m.len()..].chars().next())
    })
}

/// Find a line that already runs `command`.
pub fn existing_entry<'a>(table: &'a str, command: &Path) -> Option<&'a str> {
    let needle = command.to_string_lossy();
    table.lines().find(|l| mentions(l, &needle))
}

/// `table` with the entry for `command` appended, unrelated lines untouched.
pub fn append_entry(table: &str, command: &Path) -> String {
    let mut out = table.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&entry_line(command));
    out.push('\n');
    out
}

impl Scheduler for Crontab {
    fn kind(&self) -> &'static str {
        "crontab"
    }

    fn register(&self, job: &JobSpec) -> Result<ScheduleEntry> {
        let table = self.list()?;
        if let Some(line) = existing_entry(&table, &job.command) {
            debug!("crontab already runs {}", job.command.display());
            return Ok(ScheduleEntry {
                description: line.trim().to_string(),
                changed: false,
            });
        }
        self.install(&append_entry(&table, &job.command))?;
        Ok(ScheduleEntry {
            description: entry_line(&job.command),
            changed: true,
        })
    }
}
