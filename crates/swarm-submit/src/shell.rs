//! Runs verification commands through the platform shell

use std::path::PathBuf;
use std::process::Command;

use swarm_tasks::{VerificationExecutor, VerifyFailure};

use crate::adapter::{Result, SubmitError};

/// Runs each command in the project root, in order, stopping at the first
/// non-zero exit. Output goes straight to the terminal.
pub struct ShellVerifier {
    work_dir: PathBuf,
    /// Print `$ <command>` before each command.
    echo: bool,
}

impl ShellVerifier {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            echo: false,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Run `commands`, returning how many ran.
    pub fn run_commands(&self, commands: &[String]) -> Result<usize> {
        for command in commands {
            if self.echo {
                println!("$ {}", command);
            }
            let status = shell(command).current_dir(&self.work_dir).status()?;
            if !status.success() {
                tracing::warn!(command = %command, code = ?status.code(), "verify command failed");
                return Err(SubmitError::CommandFailed {
                    command: command.clone(),
                    code: status.code(),
                });
            }
            tracing::debug!(command = %command, "verify command passed");
        }
        Ok(commands.len())
    }
}

impl VerificationExecutor for ShellVerifier {
    fn run(&self, task_id: &str, commands: &[String]) -> std::result::Result<(), VerifyFailure> {
        tracing::info!(task_id, count = commands.len(), "running verify commands");
        match self.run_commands(commands) {
            Ok(_) => Ok(()),
            Err(SubmitError::CommandFailed { command, code }) => Err(VerifyFailure { command, code }),
            Err(e) => Err(VerifyFailure {
                command: format!("<shell: {}>", e),
                code: None,
            }),
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
