// lifecycle.rs — Status transitions with readiness, annotation, commit, and
// verification gates.
//
// A transition is checked completely before anything is written: the note,
// the transition table, readiness, commit metadata, and (for DONE) the
// task's verify commands. Only when every gate passes are the status,
// comment, and commit applied together. `force` opens the gates but still
// records the result, and every forced gate is logged.

use serde::{Deserialize, Serialize};

use crate::document::TaskDocument;
use crate::error::TaskError;
use crate::field::Field;
use crate::graph::{DependencyGraph, Readiness};
use crate::index::TaskIndex;
use crate::task::{Comment, CommitInfo, TaskStatus};
use crate::verify::VerificationExecutor;

/// A required lead token and minimum length for a transition comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRule {
    pub prefix: String,
    pub min_chars: usize,
}

impl AnnotationRule {
    pub fn new(prefix: impl Into<String>, min_chars: usize) -> Self {
        Self {
            prefix: prefix.into(),
            min_chars,
        }
    }

    /// The trimmed body must start with the prefix (case-insensitive) and be
    /// at least `min_chars` characters long.
    pub fn check(&self, body: &str) -> Result<(), TaskError> {
        let normalized = body.trim();
        if !normalized
            .to_lowercase()
            .starts_with(&self.prefix.to_lowercase())
        {
            return Err(TaskError::ValidationError(format!(
                "comment body must start with {:?}",
                self.prefix
            )));
        }
        if normalized.chars().count() < self.min_chars {
            return Err(TaskError::ValidationError(format!(
                "comment body must be at least {} characters",
                self.min_chars
            )));
        }
        Ok(())
    }
}

/// Rules for the three annotated transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecyclePolicy {
    /// Required note when entering DOING.
    pub start: AnnotationRule,
    /// Required note when entering BLOCKED.
    pub block: AnnotationRule,
    /// Rule for the optional note when entering DONE.
    pub finish: AnnotationRule,
    /// The task ID must appear in the finishing commit's message.
    pub require_task_id_in_commit: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            start: AnnotationRule::new("Start:", 40),
            block: AnnotationRule::new("Blocked:", 40),
            finish: AnnotationRule::new("Verified:", 60),
            require_task_id_in_commit: true,
        }
    }
}

/// A comment attached to a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub author: String,
    pub body: String,
}

impl Note {
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
        }
    }
}

/// What the caller wants to happen to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub target: TaskStatus,
    pub note: Option<Note>,
    pub commit: Option<CommitInfo>,
    /// Bypass the transition table, readiness, annotation, commit-subject,
    /// and verification gates.
    pub force: bool,
    /// Do not run verify commands when finishing.
    pub skip_verify: bool,
    /// Accept a finishing commit whose message does not mention the task.
    pub allow_commit_without_task_id: bool,
}

impl TransitionRequest {
    pub fn new(target: TaskStatus) -> Self {
        Self {
            target,
            note: None,
            commit: None,
            force: false,
            skip_verify: false,
            allow_commit_without_task_id: false,
        }
    }

    pub fn with_note(mut self, author: impl Into<String>, body: impl Into<String>) -> Self {
        self.note = Some(Note::new(author, body));
        self
    }

    pub fn with_commit(mut self, commit: CommitInfo) -> Self {
        self.commit = Some(commit);
        self
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn skipping_verify(mut self, skip: bool) -> Self {
        self.skip_verify = skip;
        self
    }

    pub fn allowing_commit_without_task_id(mut self, allow: bool) -> Self {
        self.allow_commit_without_task_id = allow;
        self
    }
}

/// What a successful transition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub task_id: String,
    /// Previous status as stored (may be an unrecognized value when forced).
    pub from: String,
    pub to: TaskStatus,
    /// Gates that `force` opened, in the order they were hit.
    pub overrides: Vec<String>,
    /// Number of verify commands that ran and passed.
    pub verified_commands: usize,
    /// DONE → DONE kept the task's existing commit record.
    pub kept_existing_commit: bool,
}

/// Applies status transitions to a task document.
#[derive(Debug, Clone, Default)]
pub struct LifecycleEngine {
    policy: LifecyclePolicy,
}

/// Everything decided before the document is touched.
struct Plan {
    from: String,
    overrides: Vec<String>,
    verified_commands: usize,
    keep_existing_commit: bool,
}

impl LifecycleEngine {
    pub fn new(policy: LifecyclePolicy) -> Self {
        Self { policy }
    }

    /// Move `task_id` to `request.target`, appending the note and attaching
    /// the commit in the same step. On error the document is unchanged.
    pub fn transition(
        &self,
        doc: &mut TaskDocument,
        task_id: &str,
        request: TransitionRequest,
        verifier: &dyn VerificationExecutor,
    ) -> Result<TransitionOutcome, TaskError> {
        self.check_note(request.target, request.note.as_ref(), request.force)?;
        let plan = self.plan(doc, task_id, &request, verifier)?;

        let target = request.target;
        let task = doc
            .task_mut(task_id)
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;
        if let Some(note) = request.note {
            task.push_comment(Comment::new(note.author.trim(), note.body.trim()))?;
        }
        task.set_status(target);
        if target == TaskStatus::Done && !plan.keep_existing_commit {
            if let Some(commit) = request.commit {
                task.attach_commit(commit);
            }
        }

        tracing::info!(
            task_id,
            from = %plan.from,
            to = %target,
            forced = !plan.overrides.is_empty(),
            "status transition"
        );
        Ok(TransitionOutcome {
            task_id: task_id.to_string(),
            from: plan.from,
            to: target,
            overrides: plan.overrides,
            verified_commands: plan.verified_commands,
            kept_existing_commit: plan.keep_existing_commit,
        })
    }

    fn check_note(
        &self,
        target: TaskStatus,
        note: Option<&Note>,
        force: bool,
    ) -> Result<(), TaskError> {
        if let Some(note) = note {
            if note.author.trim().is_empty() || note.body.trim().is_empty() {
                return Err(TaskError::ValidationError(
                    "comment author and body must both be non-empty".to_string(),
                ));
            }
        }
        if force {
            return Ok(());
        }
        let (rule, required) = match target {
            TaskStatus::Doing => (&self.policy.start, true),
            TaskStatus::Blocked => (&self.policy.block, true),
            TaskStatus::Done => (&self.policy.finish, false),
            TaskStatus::Todo => return Ok(()),
        };
        match note {
            Some(note) => rule.check(&note.body),
            None if required => Err(TaskError::ValidationError(format!(
                "moving to {} requires a comment starting with {:?}",
                target, rule.prefix
            ))),
            None => Ok(()),
        }
    }

    fn plan(
        &self,
        doc: &TaskDocument,
        task_id: &str,
        request: &TransitionRequest,
        verifier: &dyn VerificationExecutor,
    ) -> Result<Plan, TaskError> {
        let target = request.target;
        let force = request.force;
        let index = TaskIndex::build(&doc.tasks);
        let task = index
            .get(task_id)
            .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;
        let current = task.status();
        let from = task.status_label();
        let mut overrides = Vec::new();

        if request.note.is_some() && task.comments.is_malformed() {
            return Err(TaskError::ValidationError(format!(
                "{}: comments must be a list",
                task_id
            )));
        }

        if !current.is_some_and(|status| status.can_transition_to(target)) {
            if !force {
                return Err(TaskError::IllegalTransition {
                    task_id: task_id.to_string(),
                    from,
                    to: target.to_string(),
                });
            }
            tracing::warn!(task_id, from = %from, to = %target, "override: transition outside the table");
            overrides.push(format!("transition {} -> {}", from, target));
        }

        if target.requires_ready() {
            match DependencyGraph::build(&index).readiness(task_id) {
                Readiness::Ready => {}
                Readiness::UnknownTask => return Err(TaskError::UnknownTask(task_id.to_string())),
                Readiness::NotReady {
                    missing,
                    incomplete,
                } => {
                    if !force {
                        return Err(TaskError::UnreadyDependency {
                            task_id: task_id.to_string(),
                            missing,
                            incomplete,
                        });
                    }
                    tracing::warn!(task_id, ?missing, ?incomplete, "override: dependencies not DONE");
                    overrides.push("readiness".to_string());
                }
            }
        }

        let mut verified_commands = 0;
        let mut keep_existing_commit = false;
        if target == TaskStatus::Done {
            let commit = request.commit.as_ref().ok_or_else(|| {
                TaskError::ValidationError(format!(
                    "commit metadata is required to mark {} DONE",
                    task_id
                ))
            })?;
            commit.validate()?;

            let require_id =
                self.policy.require_task_id_in_commit && !request.allow_commit_without_task_id;
            if require_id && !commit.message.contains(task_id) {
                if !force {
                    return Err(TaskError::ValidationError(format!(
                        "commit subject does not mention {}: {:?} (use --force or --no-require-task-id-in-commit)",
                        task_id, commit.message
                    )));
                }
                tracing::warn!(task_id, message = %commit.message, "override: commit subject lacks task id");
                overrides.push("commit subject".to_string());
            }

            if current == Some(TaskStatus::Done) && !force {
                if let Field::Present(existing) = &task.commit {
                    keep_existing_commit = true;
                    if existing.hash.text() != Some(commit.hash.trim()) {
                        tracing::warn!(
                            task_id,
                            kept = %existing.hash,
                            offered = %commit.hash,
                            "task already DONE; keeping its original commit"
                        );
                    }
                }
            }

            match task.verify_commands() {
                None if !force => {
                    return Err(TaskError::ValidationError(format!(
                        "{}: verify must be a list of strings (use --force to override)",
                        task_id
                    )))
                }
                None => {
                    tracing::warn!(task_id, "override: verify is not a list; nothing run");
                    overrides.push("verify".to_string());
                }
                Some(commands) if commands.is_empty() => {}
                Some(commands) if force || request.skip_verify => {
                    tracing::warn!(task_id, count = commands.len(), "verify commands skipped");
                    if force {
                        overrides.push("verify".to_string());
                    }
                }
                Some(commands) => {
                    verifier
                        .run(task_id, &commands)
                        .map_err(|failure| TaskError::ExternalCommandFailure {
                            task_id: task_id.to_string(),
                            command: failure.command,
                            code: failure.code,
                        })?;
                    verified_commands = commands.len();
                }
            }
        }

        Ok(Plan {
            from,
            overrides,
            verified_commands,
            keep_existing_commit,
        })
    }
}
