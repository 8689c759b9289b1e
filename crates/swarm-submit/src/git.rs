//! Git-backed commit metadata and staging information

use std::path::PathBuf;
use std::process::Command;

use swarm_tasks::CommitInfo;

use crate::adapter::{CommitProvider, Result, StagingArea, SubmitError};

/// Separator git emits for `%x1f` between the hash and the subject.
const FIELD_SEPARATOR: char = '\x1f';

/// Git adapter for a single work tree
pub struct GitAdapter {
    /// Working directory for git operations
    work_dir: PathBuf,
}

impl GitAdapter {
    /// Create a new GitAdapter for the given working directory
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Run a git command in the working directory
    fn git_cmd(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SubmitError::VcsError(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn name_list(&self, args: &[&str]) -> Result<Vec<String>> {
        let out = self.git_cmd(args)?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl CommitProvider for GitAdapter {
    fn commit_info(&self, rev: &str) -> Result<CommitInfo> {
        let raw = self.git_cmd(&["show", "-s", "--pretty=format:%H%x1f%s", rev])?;
        let (hash, subject) = raw.split_once(FIELD_SEPARATOR).ok_or_else(|| {
            SubmitError::VcsError(format!("unexpected git output for rev {}", rev))
        })?;
        tracing::debug!(rev, hash = hash.trim(), "resolved commit");
        Ok(CommitInfo::new(hash.trim(), subject.trim()))
    }
}

impl StagingArea for GitAdapter {
    fn staged_files(&self) -> Result<Vec<String>> {
        self.name_list(&["diff", "--name-only", "--cached"])
    }

    fn unstaged_files(&self) -> Result<Vec<String>> {
        self.name_list(&["diff", "--name-only"])
    }
}
