//! Source-control traits and error types

use swarm_tasks::CommitInfo;
use thiserror::Error;

/// Errors that can occur while talking to source control or running commands
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("VCS operation failed: {0}")]
    VcsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A commit guard rule was not met.
    #[error("{0}")]
    GuardViolation(String),

    #[error("command `{command}` failed ({})", exit_label(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl SubmitError {
    /// Refused by policy rather than failed. The CLI maps these to exit code 2.
    pub fn is_refusal(&self) -> bool {
        matches!(self, SubmitError::GuardViolation(_))
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SubmitError>;

/// Resolves a revision to the commit metadata recorded on a finished task
pub trait CommitProvider {
    /// Full hash and subject line of `rev`.
    fn commit_info(&self, rev: &str) -> Result<CommitInfo>;
}

/// Read-only view of what is about to be committed
pub trait StagingArea {
    /// Paths staged for the next commit, relative to the repository root.
    fn staged_files(&self) -> Result<Vec<String>>;

    /// Tracked paths with changes that are not staged.
    fn unstaged_files(&self) -> Result<Vec<String>>;
}
