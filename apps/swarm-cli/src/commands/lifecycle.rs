// lifecycle.rs — ready, verify, start, block, finish.

use anyhow::Context;
use clap::Args;
use swarm_submit::{CommitProvider, GitAdapter, ShellVerifier};
use swarm_tasks::{
    DependencyGraph, NoVerification, Readiness, TaskIndex, TaskStatus, TransitionOutcome,
    TransitionRequest, VerificationExecutor,
};

use super::{paired_note, refuse, Workspace};

#[derive(Args)]
pub struct FinishArgs {
    pub task_id: String,
    /// Git rev to attach as task commit metadata.
    #[arg(long, default_value = "HEAD")]
    pub commit: String,
    /// Optional comment author (requires --body).
    #[arg(long)]
    pub author: Option<String>,
    /// Optional "Verified:" comment body (requires --author).
    #[arg(long)]
    pub body: Option<String>,
    /// Do not run verify even if configured.
    #[arg(long)]
    pub skip_verify: bool,
    /// Bypass lint, readiness, commit-subject, and verify checks.
    #[arg(long)]
    pub force: bool,
    /// Allow finishing even if the commit subject does not mention the task id.
    #[arg(long)]
    pub no_require_task_id_in_commit: bool,
}

pub fn ready(ws: &Workspace, task_id: &str) -> anyhow::Result<()> {
    let doc = ws.load()?;
    let index = TaskIndex::build(&doc.tasks);
    for warning in index.warnings() {
        ws.warn(warning);
    }
    let graph = DependencyGraph::build(&index);
    for finding in graph.findings() {
        ws.warn(finding);
    }

    match graph.readiness(task_id) {
        Readiness::Ready => {
            println!("✅ ready");
            Ok(())
        }
        Readiness::NotReady {
            missing,
            incomplete,
        } => {
            if !missing.is_empty() {
                ws.warn(format!("{}: missing deps: {}", task_id, missing.join(", ")));
            }
            if !incomplete.is_empty() {
                ws.warn(format!("{}: incomplete deps: {}", task_id, incomplete.join(", ")));
            }
            println!("⛔ not ready");
            Err(refuse(format!("task is not ready: {}", task_id)))
        }
        Readiness::UnknownTask => Err(swarm_tasks::TaskError::UnknownTask(task_id.to_string()).into()),
    }
}

pub fn verify(ws: &Workspace, task_id: &str, require: bool) -> anyhow::Result<()> {
    let doc = ws.load()?;
    let task = doc
        .task(task_id)
        .ok_or_else(|| swarm_tasks::TaskError::UnknownTask(task_id.to_string()))?;
    let Some(commands) = task.verify_commands() else {
        return Err(refuse(format!("{}: verify must be a list of strings", task_id)));
    };

    if commands.is_empty() {
        if require {
            return Err(refuse(format!("{}: no verify commands configured", task_id)));
        }
        ws.say(format!("ℹ️ {}: no verify commands configured", task_id));
        return Ok(());
    }

    ShellVerifier::new(&ws.paths.root)
        .with_echo(!ws.quiet)
        .run_commands(&commands)
        .with_context(|| format!("verify failed for {}", task_id))?;
    ws.say(format!("✅ verify passed for {}", task_id));
    Ok(())
}

pub fn start(ws: &Workspace, task_id: &str, author: &str, body: &str, force: bool) -> anyhow::Result<()> {
    let request = TransitionRequest::new(TaskStatus::Doing)
        .with_note(author, body)
        .forced(force);
    transition(ws, task_id, request, &NoVerification)?;
    ws.say(format!("✅ {} is DOING", task_id));
    Ok(())
}

pub fn block(ws: &Workspace, task_id: &str, author: &str, body: &str, force: bool) -> anyhow::Result<()> {
    let request = TransitionRequest::new(TaskStatus::Blocked)
        .with_note(author, body)
        .forced(force);
    transition(ws, task_id, request, &NoVerification)?;
    ws.say(format!("✅ {} is BLOCKED", task_id));
    Ok(())
}

pub fn finish(ws: &Workspace, args: &FinishArgs) -> anyhow::Result<()> {
    let note = paired_note(args.author.as_deref(), args.body.as_deref())?;

    let doc = ws.load()?;
    let report = ws.linter()?.lint(&doc)?;
    for warning in &report.warnings {
        ws.warn(warning);
    }
    if !report.is_ok() {
        for error in &report.errors {
            eprintln!("❌ {}", error);
        }
        if !args.force {
            return Err(refuse("tasks.json failed lint (use --force to override)"));
        }
    }

    let commit = GitAdapter::new(&ws.paths.root)
        .commit_info(&args.commit)
        .with_context(|| format!("failed to resolve commit {}", args.commit))?;

    let mut request = TransitionRequest::new(TaskStatus::Done)
        .with_commit(commit)
        .forced(args.force)
        .skipping_verify(args.skip_verify)
        .allowing_commit_without_task_id(args.no_require_task_id_in_commit);
    if let Some((author, body)) = note {
        request = request.with_note(author, body);
    }

    let verifier = ShellVerifier::new(&ws.paths.root).with_echo(!ws.quiet);
    let outcome = transition(ws, &args.task_id, request, &verifier)?;
    if outcome.kept_existing_commit {
        ws.warn(format!("{} was already DONE; kept its original commit", args.task_id));
    }
    ws.say(format!("✅ {} is DONE", args.task_id));
    Ok(())
}

/// Load for update, apply one transition, save. Shared by every status change.
pub(crate) fn transition(
    ws: &Workspace,
    task_id: &str,
    request: TransitionRequest,
    verifier: &dyn VerificationExecutor,
) -> anyhow::Result<TransitionOutcome> {
    let mut doc = ws.load_for_update(request.force)?;
    let outcome = ws.engine().transition(&mut doc, task_id, request, verifier)?;
    ws.save(&mut doc)?;
    for gate in &outcome.overrides {
        ws.warn(format!("forced past {} check for {}", gate, task_id));
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::exit_code;
    use swarm_tasks::field::string_list;
    use swarm_tasks::Task;
    use tempfile::TempDir;

    fn workspace(tasks: Vec<Task>) -> (TempDir, Workspace) {
        let project = TempDir::new().unwrap();
        let ws = Workspace::open(project.path(), true).unwrap();
        let mut doc = ws.store().init().unwrap();
        doc.tasks = tasks;
        ws.save(&mut doc).unwrap();
        (project, ws)
    }

    const NOTE: &str = "Start: implementing the lifecycle commands for the CLI";

    #[test]
    fn start_then_block() {
        let (_project, ws) = workspace(vec![Task::new("T-1", "First")]);
        start(&ws, "T-1", "CODER", NOTE, false).unwrap();
        block(
            &ws,
            "T-1",
            "CODER",
            "Blocked: the upstream API contract is still under review",
            false,
        )
        .unwrap();

        let doc = ws.load().unwrap();
        let task = doc.task("T-1").unwrap();
        assert_eq!(task.status(), Some(TaskStatus::Blocked));
        assert_eq!(task.comment_list().len(), 2);
    }

    #[test]
    fn ready_refuses_incomplete_dependency() {
        let mut t2 = Task::new("T-2", "Second");
        t2.depends_on = string_list(vec!["T-1".into()]);
        let (_project, ws) = workspace(vec![Task::new("T-1", "First"), t2]);

        assert!(ready(&ws, "T-1").is_ok());
        let err = ready(&ws, "T-2").unwrap_err();
        assert_eq!(exit_code(&err), 2);
        assert_eq!(exit_code(&ready(&ws, "T-9").unwrap_err()), 1);
    }

    #[test]
    fn start_refused_on_short_note() {
        let (_project, ws) = workspace(vec![Task::new("T-1", "First")]);
        let err = start(&ws, "T-1", "CODER", "Start: go", false).unwrap_err();
        assert_eq!(exit_code(&err), 2);
        start(&ws, "T-1", "CODER", "Start: go", true).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn verify_runs_commands_in_project_root() {
        let mut t1 = Task::new("T-1", "First");
        t1.verify = string_list(vec!["touch verified.marker".into()]);
        let (project, ws) = workspace(vec![t1, Task::new("T-2", "No checks")]);

        verify(&ws, "T-1", false).unwrap();
        assert!(project.path().join("verified.marker").exists());

        assert!(verify(&ws, "T-2", false).is_ok());
        assert_eq!(exit_code(&verify(&ws, "T-2", true).unwrap_err()), 2);
    }
}
