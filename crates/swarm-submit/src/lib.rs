//! Source-control and shell integration for the task workflow
//!
//! The core task crate stays free of process spawning. This crate supplies
//! the pieces that talk to the outside world: a git-backed `CommitProvider`
//! and `StagingArea`, the `CommitGuard` that checks a task commit before it
//! is made, and a `ShellVerifier` that runs a task's verify commands.

pub mod adapter;
pub mod git;
pub mod guard;
pub mod shell;

pub use adapter::{CommitProvider, Result, StagingArea, SubmitError};
pub use git::GitAdapter;
pub use guard::{
    commit_message_has_meaningful_summary, path_is_under, CommitGuard, GuardReport, GuardRequest,
};
pub use shell::ShellVerifier;
