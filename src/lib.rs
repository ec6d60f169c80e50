//! Crate entry point for **autosnap**.
//!
//! autosnap keeps an hourly git history of an arbitrary directory. The
//! repository metadata lives outside the directory, and a scheduled agent
//! commits whatever changed since the last run.
//!
//! The crate backs two binaries: `autosnap` provisions a target once, and
//! `autosnap-agent` performs one snapshot per scheduler tick. Each
//! submodule encapsulates one responsibility; the `pub use` re-exports are
//! what the binaries and integration tests build on.

pub mod agent;
mod config;
mod error;
mod exclude;
pub mod git;
pub mod logger;
mod paths;
mod progress;
pub mod provision;
pub mod scheduler;
mod shell;

pub use agent::{AgentConfig, RunOutcome};
pub use config::{Settings, load_settings};
pub use error::{Error, Result};
pub use exclude::{header_line, parse_ignore_spec};
pub use paths::{Paths, autosnap_home, paths};
pub use progress::Progress;
pub use provision::{ProvisionReport, ProvisionRequest, provision};
