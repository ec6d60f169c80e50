//! # autosnap
//!
//! **autosnap** turns a directory into an hourly-versioned snapshot store.
//!
//! ```text
//! autosnap NAME WORKDIR GITDIR [IGNORE]
//! ```
//!
//! - creates (or reuses) a git repository at `GITDIR/.git` whose work tree
//!   is `WORKDIR`
//! - merges the `;`-separated `IGNORE` patterns into its exclude list
//! - writes an agent wrapper for `NAME` and registers it with launchd or
//!   the user's crontab
//!
//! Re-running with the same arguments is safe and changes nothing.
//! Usage errors exit with 2, validation and setup failures with 1.
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::{Context, Result};
use autosnap::git::GitCli;
use autosnap::{Progress, ProvisionReport, ProvisionRequest, load_settings, paths, provision};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "autosnap",
    version,
    about = "autosnap - hourly git snapshots of a directory"
)]
struct Cli {
    /// Target name: letters, digits, '_' and '-'
    name: String,
    /// Directory to snapshot
    work_dir: PathBuf,
    /// Where the repository lives; must be outside WORKDIR
    git_dir: PathBuf,
    /// Ignore patterns separated by ';', e.g. "*.tmp;.DS_Store"
    ignore: Option<String>,
}

fn agent_binary() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the autosnap executable")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    let agent = exe.with_file_name("autosnap-agent");
    if !agent.is_file() {
        anyhow::bail!("agent binary not found next to autosnap: {}", agent.display());
    }
    Ok(agent)
}

fn run(cli: Cli) -> Result<ProvisionReport> {
    let p = paths()?;
    let settings = load_settings(&p.config)?;
    let req = ProvisionRequest {
        name: cli.name,
        work_dir: cli.work_dir,
        repo_dir: cli.git_dir,
        ignore: cli.ignore,
        agent_bin: agent_binary()?,
        git: GitCli::locate()?,
        settings,
    };
    let scheduler = autosnap::scheduler::detect()?;
    let report = provision(&req, &p, scheduler.as_ref(), &Progress::stderr())?;
    Ok(report)
}

/// CLI entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = autosnap::logger::init("warn") {
        eprintln!("autosnap: cannot initialize logging: {e}");
    }

    match run(cli) {
        Ok(report) => {
            println!(
                "{} {}",
                "✔".green(),
                format!("autosnap target '{}' is active", report.target.name).bold()
            );
            print!("{}", report.summary());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {:#}", "autosnap:".red(), e);
            ExitCode::FAILURE
        }
    }
}
