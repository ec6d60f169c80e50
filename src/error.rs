//! Error types shared by the provisioner and the agent.
//!
//! The variants follow the failure taxonomy of the tool: bad input is a
//! [`Error::Config`], a broken host or target is an [`Error::Environment`],
//! git failures carry git's own diagnostic text, and scheduler failures only
//! ever come out of provisioning.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad arguments or an unsafe repository/work-tree layout.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required tool or directory is missing.
    #[error("environment error: {0}")]
    Environment(String),

    /// A git operation failed. `detail` is git's raw diagnostic.
    #[error("git {op} failed: {detail}")]
    Vcs { op: &'static str, detail: String },

    /// Registering the agent with the host scheduler failed.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("repository error: {0}")]
    Git(#[from] git2::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn environment(msg: impl Into<String>) -> Self {
        Self::Environment(msg.into())
    }

    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }

    pub fn vcs(op: &'static str, detail: impl Into<String>) -> Self {
        Self::Vcs {
            op,
            detail: detail.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Attach a path to an `io::Error`, in the spirit of `anyhow::Context`.
pub trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
