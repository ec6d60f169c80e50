//! `autosnap-agent`: one snapshot attempt for one target.
//!
//! Invoked by the wrapper `autosnap` generates, never by hand. Every
//! parameter arrives as an argument; nothing is read from the environment
//! except the optional `AUTOSNAP_LOG` filter.

use autosnap::agent::{self, AgentConfig};
use autosnap::git::{GitCli, RepositoryHandle};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "autosnap-agent",
    version,
    about = "Commit pending changes of one autosnap target"
)]
struct Cli {
    #[arg(long)]
    name: String,
    #[arg(long)]
    work_dir: PathBuf,
    /// Repository metadata directory
    #[arg(long)]
    git_dir: PathBuf,
    /// Absolute path of the git binary
    #[arg(long)]
    git: PathBuf,
    /// Append-only error log for this target
    #[arg(long)]
    log_file: PathBuf,
    /// Seconds after which an existing lock is considered abandoned
    #[arg(long, default_value_t = 24 * 3600)]
    stale_after: u64,
    #[arg(long, default_value = "autocommit")]
    message: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = autosnap::logger::init("warn") {
        eprintln!("autosnap-agent: cannot initialize logging: {e}");
    }

    let cfg = AgentConfig {
        name: cli.name,
        handle: RepositoryHandle::new(cli.git_dir, cli.work_dir),
        error_log: cli.log_file,
        stale_after: Duration::from_secs(cli.stale_after),
        message: cli.message,
        handle_signals: true,
    };
    agent::run(&cfg, &GitCli::new(cli.git))
}
