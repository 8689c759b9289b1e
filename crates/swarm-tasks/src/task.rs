// task.rs — Task: the unit of work shared between agents.
//
// A Task carries identity, status, dependencies, and an audit trail
// (comments plus the commit that finished it). Every field is a `Field`
// so a hand-edited document still loads and can be linted.
//
// Status lifecycle:
//   TODO → DOING → DONE
//   TODO/DOING → BLOCKED → TODO/DOING
//   DONE is terminal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TaskError;
use crate::field::{valid_entries, Entry, Field};

/// The lifecycle status of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// An agent is working on it.
    Doing,
    /// Waiting on something outside the task graph.
    Blocked,
    /// Finished and attached to a commit. Terminal.
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::Doing,
        TaskStatus::Blocked,
        TaskStatus::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::Doing => "DOING",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Done => "DONE",
        }
    }

    /// Check whether moving from this status to `next` is in the transition table.
    ///
    /// Re-requesting the current status is always allowed, including DONE → DONE.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (TaskStatus::Todo, TaskStatus::Doing)
                | (TaskStatus::Todo, TaskStatus::Blocked)
                | (TaskStatus::Doing, TaskStatus::Done)
                | (TaskStatus::Doing, TaskStatus::Blocked)
                | (TaskStatus::Blocked, TaskStatus::Todo)
                | (TaskStatus::Blocked, TaskStatus::Doing)
        )
    }

    /// Entering these statuses requires every dependency to be DONE.
    pub fn requires_ready(self) -> bool {
        matches!(self, TaskStatus::Doing | TaskStatus::Done)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TODO" => Ok(TaskStatus::Todo),
            "DOING" => Ok(TaskStatus::Doing),
            "BLOCKED" => Ok(TaskStatus::Blocked),
            "DONE" => Ok(TaskStatus::Done),
            _ => Err(TaskError::ValidationError(format!(
                "invalid status: {} (allowed: BLOCKED, DOING, DONE, TODO)",
                s.trim()
            ))),
        }
    }
}

/// A comment in a task's audit trail.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub author: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub body: Field<String>,

    /// Keys we don't model, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Comment {
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author: Field::Present(author.into()),
            body: Field::Present(body.into()),
            extra: Map::new(),
        }
    }
}

/// Commit metadata as stored on a task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommitRecord {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub hash: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub message: Field<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Commit metadata handed to the lifecycle engine by a commit provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    /// Full or abbreviated commit hash (at least 7 characters).
    pub hash: String,
    /// Commit subject line.
    pub message: String,
}

impl CommitInfo {
    pub const MIN_HASH_LEN: usize = 7;

    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
        }
    }

    /// Reject hashes shorter than an abbreviated git hash and empty messages.
    pub fn validate(&self) -> Result<(), TaskError> {
        if self.hash.trim().chars().count() < Self::MIN_HASH_LEN {
            return Err(TaskError::ValidationError(format!(
                "commit.hash must be a git hash (at least {} characters): {:?}",
                Self::MIN_HASH_LEN,
                self.hash
            )));
        }
        if self.message.trim().is_empty() {
            return Err(TaskError::ValidationError(
                "commit.message must be non-empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<CommitInfo> for CommitRecord {
    fn from(info: CommitInfo) -> Self {
        Self {
            hash: Field::Present(info.hash.trim().to_string()),
            message: Field::Present(info.message.trim().to_string()),
            extra: Map::new(),
        }
    }
}

/// A task record from tasks.json.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Task {
    /// Unique, case-sensitive identifier (e.g., "T-123").
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub id: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub title: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub description: Field<String>,

    /// One of TODO, DOING, BLOCKED, DONE. Unset means TODO.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub status: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub priority: Field<String>,

    /// Agent ID (or "HUMAN") responsible for the task.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub owner: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub tags: Field<Vec<Entry<String>>>,

    /// IDs of tasks that must be DONE before this one can start.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub depends_on: Field<Vec<Entry<String>>>,

    /// Shell commands that must pass before the task is marked DONE.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub verify: Field<Vec<Entry<String>>>,

    /// Append-only audit trail.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub comments: Field<Vec<Entry<Comment>>>,

    /// The commit that finished the task. Required once DONE.
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub commit: Field<CommitRecord>,

    /// Keys we don't model, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    /// Create a TODO task with only an ID and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Field::Present(id.into()),
            title: Field::Present(title.into()),
            status: Field::Present(TaskStatus::Todo.as_str().to_string()),
            ..Self::default()
        }
    }

    /// The trimmed ID, or `None` if the task has no usable ID.
    pub fn id_str(&self) -> Option<&str> {
        self.id.text()
    }

    /// The parsed status. Unset or blank means TODO; `None` means the stored
    /// value is not a known status.
    pub fn status(&self) -> Option<TaskStatus> {
        match &self.status {
            Field::Absent | Field::Null => Some(TaskStatus::Todo),
            Field::Malformed(_) => None,
            Field::Present(raw) if raw.trim().is_empty() => Some(TaskStatus::Todo),
            Field::Present(raw) => raw.parse().ok(),
        }
    }

    /// The stored status rendered for messages, normalized like `status()`.
    pub fn status_label(&self) -> String {
        match &self.status {
            Field::Absent | Field::Null => TaskStatus::Todo.to_string(),
            Field::Malformed(raw) => raw.to_string(),
            Field::Present(raw) if raw.trim().is_empty() => TaskStatus::Todo.to_string(),
            Field::Present(raw) => raw.trim().to_ascii_uppercase(),
        }
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = Field::Present(status.as_str().to_string());
    }

    /// Well-formed, non-blank verify commands (trimmed). `None` when
    /// `verify` is present but not a list.
    pub fn verify_commands(&self) -> Option<Vec<String>> {
        valid_entries(&self.verify).map(|commands| {
            commands
                .into_iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    /// Append a comment. Existing comments are never rewritten; a `comments`
    /// value that is not a list is refused rather than replaced.
    pub fn push_comment(&mut self, comment: Comment) -> Result<(), TaskError> {
        if self.comments.is_malformed() {
            return Err(TaskError::ValidationError(format!(
                "{}: comments must be a list",
                self.id_str().unwrap_or("<no-id>")
            )));
        }
        if let Field::Present(comments) = &mut self.comments {
            comments.push(Entry::Valid(comment));
        } else {
            self.comments = Field::Present(vec![Entry::Valid(comment)]);
        }
        Ok(())
    }

    /// Well-formed comments, oldest first.
    pub fn comment_list(&self) -> Vec<&Comment> {
        valid_entries(&self.comments).unwrap_or_default()
    }

    /// Tags that are strings, in stored order.
    pub fn tag_list(&self) -> Vec<&str> {
        valid_entries(&self.tags)
            .unwrap_or_default()
            .into_iter()
            .map(String::as_str)
            .collect()
    }

    pub fn attach_commit(&mut self, info: CommitInfo) {
        self.commit = Field::Present(info.into());
    }
}
