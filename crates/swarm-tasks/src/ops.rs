// ops.rs — Sanctioned edits to the task document other than status changes.
//
// These functions work on an in-memory `TaskDocument`; callers load it
// through `TaskStore::load_for_update` and save it afterwards so the seal is
// refreshed. An existing task's status only moves through
// `LifecycleEngine::transition`; a new task's initial status is gated on
// the same readiness rule.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::document::TaskDocument;
use crate::error::TaskError;
use crate::field::{dedup_strings, string_list, Entry, Field};
use crate::graph::{DependencyGraph, Readiness};
use crate::index::TaskIndex;
use crate::task::{Comment, Task, TaskStatus};

/// Fields for a task created with [`add_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<String>,
    pub owner: Option<String>,
    pub tags: Vec<String>,
    pub depends_on: Vec<String>,
    pub verify: Vec<String>,
    /// Optional first comment as `(author, body)`.
    pub comment: Option<(String, String)>,
}

/// Append a new task. Fails if the ID is blank or already used.
///
/// A new task may start as TODO or BLOCKED, or as DOING once every
/// dependency is DONE. It can never start as DONE, since it has no commit.
pub fn add_task(doc: &mut TaskDocument, new: NewTask) -> Result<&Task, TaskError> {
    let id = new.id.trim().to_string();
    if id.is_empty() {
        return Err(TaskError::ValidationError("task id must be non-empty".to_string()));
    }
    if new.title.trim().is_empty() {
        return Err(TaskError::ValidationError(format!("{}: title must be non-empty", id)));
    }
    if doc.task(&id).is_some() {
        return Err(TaskError::DuplicateTask(id));
    }

    let status = new.status.unwrap_or(TaskStatus::Todo);
    if status == TaskStatus::Done {
        return Err(TaskError::ValidationError(format!(
            "{}: a new task cannot start as DONE (add it, then finish it)",
            id
        )));
    }

    let mut task = Task::new(id.clone(), new.title.trim());
    task.set_status(status);
    task.description = optional_text(new.description);
    task.priority = optional_text(new.priority);
    task.owner = optional_text(new.owner);
    task.tags = string_list(dedup_strings(&new.tags));
    let depends_on = dedup_strings(&new.depends_on);
    if !depends_on.is_empty() {
        task.depends_on = string_list(depends_on);
    }
    let verify = dedup_strings(&new.verify);
    if !verify.is_empty() {
        task.verify = string_list(verify);
    }
    if let Some((author, body)) = new.comment {
        task.push_comment(checked_comment(&author, &body)?)?;
    }

    doc.tasks.push(task);
    if status == TaskStatus::Doing {
        let readiness = DependencyGraph::build(&TaskIndex::build(&doc.tasks)).readiness(&id);
        if let Readiness::NotReady { missing, incomplete } = readiness {
            doc.tasks.pop();
            return Err(TaskError::UnreadyDependency {
                task_id: id,
                missing,
                incomplete,
            });
        }
    }

    tracing::info!(task_id = %id, %status, "task added");
    let index = doc.tasks.len() - 1;
    Ok(&doc.tasks[index])
}

/// Changes applied by [`update_task`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub owner: Option<String>,
    /// Appended to the existing tags (after clearing if `replace_tags`).
    pub tags: Vec<String>,
    pub replace_tags: bool,
    pub depends_on: Vec<String>,
    pub replace_depends_on: bool,
    pub verify: Vec<String>,
    pub replace_verify: bool,
}

pub fn update_task(doc: &mut TaskDocument, task_id: &str, update: TaskUpdate) -> Result<(), TaskError> {
    let task = doc
        .task_mut(task_id)
        .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;

    if let Some(title) = update.title {
        if title.trim().is_empty() {
            return Err(TaskError::ValidationError(format!("{}: title must be non-empty", task_id)));
        }
        task.title = Field::Present(title.trim().to_string());
    }
    if let Some(description) = update.description {
        task.description = Field::Present(description);
    }
    if let Some(priority) = update.priority {
        task.priority = Field::Present(priority);
    }
    if let Some(owner) = update.owner {
        task.owner = Field::Present(owner);
    }

    merge_list(&mut task.tags, update.tags, update.replace_tags);
    merge_list(&mut task.depends_on, update.depends_on, update.replace_depends_on);
    merge_list(&mut task.verify, update.verify, update.replace_verify);

    tracing::info!(task_id, "task updated");
    Ok(())
}

/// Append a comment to a task's audit trail.
pub fn add_comment(doc: &mut TaskDocument, task_id: &str, author: &str, body: &str) -> Result<(), TaskError> {
    let comment = checked_comment(author, body)?;
    let task = doc
        .task_mut(task_id)
        .ok_or_else(|| TaskError::UnknownTask(task_id.to_string()))?;
    task.push_comment(comment)?;
    tracing::info!(task_id, author = author.trim(), "comment added");
    Ok(())
}

/// Result of a [`scrub`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrubReport {
    /// IDs of tasks with at least one replacement, sorted and de-duplicated.
    pub changed: Vec<String>,
    pub dry_run: bool,
}

/// Replace `find` with `replace` in every string value of every task,
/// including nested comments and unknown keys. Keys are left alone. With
/// `dry_run` the document is not modified.
pub fn scrub(doc: &mut TaskDocument, find: &str, replace: &str, dry_run: bool) -> Result<ScrubReport, TaskError> {
    if find.is_empty() {
        return Err(TaskError::ValidationError("--find must be non-empty".to_string()));
    }

    let mut changed = BTreeSet::new();
    let mut scrubbed = Vec::with_capacity(doc.tasks.len());
    for task in &doc.tasks {
        let before = serde_json::to_value(task)?;
        let mut after = before.clone();
        replace_strings(&mut after, find, replace);
        if after == before {
            scrubbed.push(None);
            continue;
        }
        let task: Task = serde_json::from_str(&after.to_string())?;
        changed.insert(task.id_str().unwrap_or("<no-id>").to_string());
        scrubbed.push(Some(task));
    }

    if !dry_run {
        for (slot, replacement) in doc.tasks.iter_mut().zip(scrubbed) {
            if let Some(task) = replacement {
                *slot = task;
            }
        }
        tracing::info!(changed = changed.len(), "scrubbed task text");
    }
    Ok(ScrubReport {
        changed: changed.into_iter().collect(),
        dry_run,
    })
}

/// Selection for listing tasks. Each non-empty set must match.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub statuses: Vec<TaskStatus>,
    /// Matched case-insensitively.
    pub owners: Vec<String>,
    /// A task matches when it has any of these tags.
    pub tags: Vec<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if !self.statuses.is_empty() && !task.status().is_some_and(|s| self.statuses.contains(&s)) {
            return false;
        }
        if !self.owners.is_empty() {
            let owner = task.owner.text().unwrap_or_default().to_uppercase();
            if !self.owners.iter().any(|o| o.trim().to_uppercase() == owner) {
                return false;
            }
        }
        if !self.tags.is_empty() {
            let tags = task.tag_list();
            if !self.tags.iter().any(|want| tags.contains(&want.trim())) {
                return false;
            }
        }
        true
    }
}

/// Indexed tasks matching `filter`, sorted by ID.
pub fn list_tasks<'a>(index: &TaskIndex<'a>, filter: &TaskFilter) -> Vec<(&'a str, &'a Task)> {
    let mut tasks: Vec<_> = index.iter().filter(|(_, task)| filter.matches(task)).collect();
    tasks.sort_by(|a, b| a.0.cmp(b.0));
    tasks
}

fn checked_comment(author: &str, body: &str) -> Result<Comment, TaskError> {
    if author.trim().is_empty() || body.trim().is_empty() {
        return Err(TaskError::ValidationError(
            "comment author and body must both be non-empty".to_string(),
        ));
    }
    Ok(Comment::new(author.trim(), body.trim()))
}

fn optional_text(value: Option<String>) -> Field<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Field::Present(text.trim().to_string()),
        _ => Field::Absent,
    }
}

/// Merge `additions` into a string list field, keeping only well-formed
/// existing entries. A `replace` with no additions leaves an empty list.
fn merge_list(field: &mut Field<Vec<Entry<String>>>, additions: Vec<String>, replace: bool) {
    if replace {
        *field = Field::Present(Vec::new());
    }
    if additions.is_empty() {
        return;
    }
    let existing: Vec<String> = match field {
        Field::Present(entries) => entries.iter().filter_map(Entry::valid).cloned().collect(),
        _ => Vec::new(),
    };
    *field = string_list(dedup_strings(existing.iter().chain(additions.iter())));
}

fn replace_strings(value: &mut Value, find: &str, replace: &str) {
    match value {
        Value::String(text) => {
            if text.contains(find) {
                *text = text.replace(find, replace);
            }
        }
        Value::Array(items) => {
            for item in items {
                replace_strings(item, find, replace);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                replace_strings(item, find, replace);
            }
        }
        _ => {}
    }
}
