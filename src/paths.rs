use std::{env, path::PathBuf};

use crate::error::{Error, Result};

/// Per-user locations used by autosnap.
#[derive(Clone, Debug)]
pub struct Paths {
    /// Generated agent wrappers, one per target.
    pub bin: PathBuf,
    /// Per-target error logs and scheduler stdout/stderr captures.
    pub logs: PathBuf,
    /// Optional provisioner settings.
    pub config: PathBuf,
}

fn home() -> Result<PathBuf> {
    env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| Error::environment("HOME is not set"))
}

fn xdg_or(var: &str, fallback: &[&str]) -> Result<PathBuf> {
    match env::var_os(var).filter(|v| !v.is_empty()) {
        Some(v) => Ok(PathBuf::from(v)),
        None => Ok(fallback.iter().fold(home()?, |p, c| p.join(c))),
    }
}

/// Data directory holding wrappers and logs.
pub fn autosnap_home() -> Result<PathBuf> {
    Ok(xdg_or("XDG_DATA_HOME", &[".local", "share"])?.join("autosnap"))
}

pub fn paths() -> Result<Paths> {
    let data = autosnap_home()?;
    Ok(Paths {
        bin: data.join("bin"),
        logs: data.join("logs"),
        config: xdg_or("XDG_CONFIG_HOME", &[".config"])?
            .join("autosnap")
            .join("config.toml"),
    })
}

/// Directory for launchd job definitions.
pub fn launch_agents_dir() -> Result<PathBuf> {
    Ok(home()?.join("Library").join("LaunchAgents"))
}

impl Paths {
    pub fn wrapper(&self, name: &str) -> PathBuf {
        self.bin.join(format!("autosnap-{name}"))
    }

    pub fn error_log(&self, name: &str) -> PathBuf {
        self.logs.join(format!("{name}.error.log"))
    }

    pub fn stdout_log(&self, name: &str) -> PathBuf {
        self.logs.join(format!("{name}.out.log"))
    }

    pub fn stderr_log(&self, name: &str) -> PathBuf {
        self.logs.join(format!("{name}.err.log"))
    }
}
