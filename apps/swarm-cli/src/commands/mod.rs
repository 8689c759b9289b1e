// mod.rs — Shared context for agentctl subcommands.

pub mod agents;
pub mod guard;
pub mod lifecycle;
pub mod task;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::Context;
use swarm_submit::SubmitError;
use swarm_tasks::{
    AgentRegistry, LifecycleEngine, Linter, ProjectPaths, TaskDocument, TaskError, TaskStore,
    WorkflowConfig,
};

/// Everything a subcommand needs to find and interpret the project.
pub struct Workspace {
    pub paths: ProjectPaths,
    pub workflow: WorkflowConfig,
    pub quiet: bool,
}

impl Workspace {
    pub fn open(project_root: &Path, quiet: bool) -> anyhow::Result<Self> {
        let paths = ProjectPaths::for_project(project_root);
        let workflow = WorkflowConfig::load_or_default(&paths.workflow_config)
            .context("failed to load workflow config")?;
        tracing::debug!(
            root = %paths.root.display(),
            tasks = %paths.tasks_file.display(),
            "opened workspace"
        );
        Ok(Self {
            paths,
            workflow,
            quiet,
        })
    }

    pub fn store(&self) -> TaskStore {
        TaskStore::new(&self.paths.tasks_file)
    }

    /// Read-only load; the seal is not checked.
    pub fn load(&self) -> anyhow::Result<TaskDocument> {
        self.store()
            .load()
            .with_context(|| format!("failed to read {}", self.paths.tasks_file.display()))
    }

    /// Load for a write. A broken seal is refused unless `force`.
    pub fn load_for_update(&self, force: bool) -> anyhow::Result<TaskDocument> {
        self.store().load_for_update(force).with_context(|| {
            format!(
                "refusing to modify {} (use --force to override)",
                self.paths.tasks_file.display()
            )
        })
    }

    pub fn save(&self, doc: &mut TaskDocument) -> anyhow::Result<()> {
        self.store()
            .save(doc)
            .with_context(|| format!("failed to write {}", self.paths.tasks_file.display()))
    }

    pub fn engine(&self) -> LifecycleEngine {
        LifecycleEngine::new(self.workflow.lifecycle.clone())
    }

    /// Registered agent IDs; empty when there is no agents directory.
    pub fn known_agents(&self) -> anyhow::Result<BTreeSet<String>> {
        let registry = AgentRegistry::load_or_empty(&self.paths.agents_dir)
            .context("failed to read agent registry")?;
        Ok(registry.known_ids())
    }

    pub fn linter(&self) -> anyhow::Result<Linter> {
        Ok(Linter::new(self.store().schema().clone()).with_known_agents(self.known_agents()?))
    }

    /// Print a warning line unless `--quiet`.
    pub fn warn(&self, message: impl fmt::Display) {
        if !self.quiet {
            println!("⚠️ {}", message);
        }
    }

    /// Print a status line unless `--quiet`.
    pub fn say(&self, message: impl fmt::Display) {
        if !self.quiet {
            println!("{}", message);
        }
    }
}

/// An operation refused by a workflow rule (exit code 2).
#[derive(Debug)]
pub struct Refused(pub String);

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Refused {}

pub fn refuse(message: impl Into<String>) -> anyhow::Error {
    Refused(message.into()).into()
}

/// 2 for refusals anywhere in the error chain, 1 for everything else.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let refused = err.chain().any(|cause| {
        cause.downcast_ref::<Refused>().is_some()
            || cause.downcast_ref::<TaskError>().is_some_and(TaskError::is_refusal)
            || cause.downcast_ref::<SubmitError>().is_some_and(SubmitError::is_refusal)
    });
    if refused {
        2
    } else {
        1
    }
}

/// `--author` and `--body` must come together.
pub fn paired_note(
    author: Option<&str>,
    body: Option<&str>,
) -> anyhow::Result<Option<(String, String)>> {
    match (author, body) {
        (Some(author), Some(body)) => Ok(Some((author.to_string(), body.to_string()))),
        (None, None) => Ok(None),
        _ => Err(refuse("--author and --body must be provided together")),
    }
}
