use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{JobSpec, ScheduleEntry, Scheduler, stderr_of, tool};
use crate::error::{Error, IoContext, Result};

/// Periodic-daemon variant: a per-user launchd agent.
#[derive(Debug, Clone)]
pub struct Launchd {
    launchctl: PathBuf,
    agents_dir: PathBuf,
}

pub fn label(name: &str) -> String {
    format!("com.autosnap.{name}")
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Property list for `job`.
pub fn render_plist(job: &JobSpec) -> String {
    let esc = |p: &Path| xml_escape(&p.to_string_lossy());
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{command}</string>
    </array>
    <key>StartInterval</key>
    <integer>{interval}</integer>
    <key>StandardOutPath</key>
    <string>{stdout}</string>
    <key>StandardErrorPath</key>
    <string>{stderr}</string>
</dict>
</plist>
"#,
        label = xml_escape(&label(&job.name)),
        command = esc(&job.command),
        interval = job.interval_secs,
        stdout = esc(&job.stdout_log),
        stderr = esc(&job.stderr_log),
    )
}

impl Launchd {
    pub fn new(launchctl: impl Into<PathBuf>, agents_dir: impl Into<PathBuf>) -> Self {
        Self {
            launchctl: launchctl.into(),
            agents_dir: agents_dir.into(),
        }
    }

    pub fn plist_path(&self, name: &str) -> PathBuf {
        self.agents_dir.join(format!("{}.plist", label(name)))
    }
}

impl Scheduler for Launchd {
    fn kind(&self) -> &'static str {
        "launchd"
    }

    fn register(&self, job: &JobSpec) -> Result<ScheduleEntry> {
        fs::create_dir_all(&self.agents_dir).at(&self.agents_dir)?;
        let plist = self.plist_path(&job.name);
        let content = render_plist(job);
        let changed = fs::read_to_string(&plist).ok().as_deref() != Some(content.as_str());
        if changed {
            fs::write(&plist, &content).at(&plist)?;
        }

        // Unloading first turns a reload into an update instead of a
        // duplicate; it fails harmlessly when nothing was loaded.
        let unload = tool(
            &self.launchctl,
            &[OsStr::new("unload"), plist.as_os_str()],
        )?;
        if !unload.status.success() {
            debug!("launchctl unload: {}", stderr_of(&unload));
        }
        let load = tool(
            &self.launchctl,
            &[OsStr::new("load"), plist.as_os_str()],
        )?;
        if !load.status.success() {
            return Err(Error::scheduler(format!(
                "launchctl load {} failed: {}",
                plist.display(),
                stderr_of(&load)
            )));
        }

        Ok(ScheduleEntry {
            description: format!(
                "launchd {} every {}s ({})",
                label(&job.name),
                job.interval_secs,
                plist.display()
            ),
            changed,
        })
    }
}
