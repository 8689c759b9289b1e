// guard.rs — Guard subcommands: clean, commit.

use clap::Subcommand;
use swarm_submit::{CommitGuard, GitAdapter, GuardRequest};

use super::Workspace;

#[derive(Subcommand)]
pub enum GuardCommands {
    /// Fail if there are staged files.
    Clean,
    /// Validate staged files and the planned commit message.
    Commit {
        /// Active task id (must appear in --message).
        task_id: String,
        /// Planned commit message.
        #[arg(long, short = 'm')]
        message: String,
        /// Allowed path prefix (repeatable).
        #[arg(long)]
        allow: Vec<String>,
        /// Allow staging tasks.json and other protected paths.
        #[arg(long)]
        allow_tasks: bool,
        /// Fail if there are unstaged changes.
        #[arg(long)]
        require_clean: bool,
    },
}

pub fn execute(cmd: &GuardCommands, ws: &Workspace) -> anyhow::Result<()> {
    let git = GitAdapter::new(&ws.paths.root);
    let guard = CommitGuard::new(ws.workflow.guard.protected_paths.clone());

    match cmd {
        GuardCommands::Clean => {
            guard.check_clean(&git)?;
            ws.say("✅ index clean (no staged files)");
        }
        GuardCommands::Commit {
            task_id,
            message,
            allow,
            allow_tasks,
            require_clean,
        } => {
            let request = GuardRequest {
                task_id: task_id.clone(),
                message: message.clone(),
                allow: allow.clone(),
                allow_protected: *allow_tasks,
                require_clean: *require_clean,
            };
            let report = guard.check(&git, &request)?;
            if !report.unstaged.is_empty() && !*require_clean {
                ws.warn(format!(
                    "working tree has {} unstaged file(s); ignoring (multi-agent workspace)",
                    report.unstaged.len()
                ));
            }
            ws.say("✅ guard passed");
        }
    }
    Ok(())
}
