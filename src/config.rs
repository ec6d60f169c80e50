use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Provisioner settings loaded from `config.toml`.
///
/// Every value is baked into the generated agent wrapper at provisioning
/// time; the agent itself never reads this file.
///
/// Example TOML:
/// ```toml
/// stale_lock_hours = 12
/// commit_message   = "snapshot"
/// interval_secs    = 1800
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Age after which a lock left behind by a dead agent is reclaimed.
    pub stale_lock_hours: u64,
    pub commit_message: String,
    /// Launchd `StartInterval`. Crontab entries are always hourly.
    pub interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stale_lock_hours: 24,
            commit_message: "autocommit".to_string(),
            interval_secs: 3600,
        }
    }
}

impl Settings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_lock_hours * 3600)
    }

    fn validate(self) -> Result<Self> {
        if self.stale_lock_hours == 0 {
            return Err(Error::config("stale_lock_hours must be at least 1"));
        }
        if self.interval_secs == 0 {
            return Err(Error::config("interval_secs must be at least 1"));
        }
        if self.commit_message.trim().is_empty() {
            return Err(Error::config("commit_message must not be empty"));
        }
        Ok(self)
    }
}

/// Load settings from `path`.
///
/// A missing file yields [`Settings::default`]; a file that exists but
/// cannot be parsed is a configuration error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let txt = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
        Err(e) => {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let s: Settings = toml::from_str(&txt)
        .map_err(|e| Error::config(format!("failed to parse {}: {}", path.display(), e)))?;
    s.validate()
}
