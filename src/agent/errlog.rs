use chrono::{Local, SecondsFormat};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only, per-target error log.
///
/// Nobody watches a scheduled run, so this file (plus the exit status) is
/// the only place an agent failure shows up.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `[<timestamp>] <message>`. Multi-line messages are folded
    /// onto one line so every entry stays greppable by timestamp.
    pub fn append(&self, message: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let folded = message.lines().collect::<Vec<_>>().join(" | ");
        writeln!(
            f,
            "[{}] {}",
            Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            folded
        )
    }
}
