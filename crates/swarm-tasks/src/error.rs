// error.rs — Error types for the task store and lifecycle engine.

use thiserror::Error;

/// Errors that can occur while loading, validating, or mutating the task document.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize/deserialize task data.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The document could not be parsed into a task collection at all.
    #[error("malformed task document: {0}")]
    MalformedDocument(String),

    /// A schema or invariant violation. The document is usable in memory
    /// but must not be trusted until fixed.
    #[error("{0}")]
    ValidationError(String),

    /// The requested status change is not in the transition table.
    #[error("refusing status transition {from} -> {to} for {task_id} (use --force to override)")]
    IllegalTransition {
        task_id: String,
        from: String,
        to: String,
    },

    /// A prerequisite is missing or not DONE yet.
    #[error(
        "task {task_id} is not ready (missing: {}; incomplete: {})",
        list_or_dash(.missing),
        list_or_dash(.incomplete)
    )]
    UnreadyDependency {
        task_id: String,
        missing: Vec<String>,
        incomplete: Vec<String>,
    },

    /// The recorded checksum does not match the tasks payload.
    #[error("meta.checksum {recorded} does not match tasks payload {computed} (manual edit?)")]
    IntegrityMismatch { recorded: String, computed: String },

    /// A verification command exited unsuccessfully.
    #[error("verify command failed for {task_id}: `{command}` ({})", exit_label(.code))]
    ExternalCommandFailure {
        task_id: String,
        command: String,
        code: Option<i32>,
    },

    /// No task with this ID exists.
    #[error("unknown task id: {0}")]
    UnknownTask(String),

    /// A task with this ID already exists.
    #[error("task already exists: {0}")]
    DuplicateTask(String),

    /// The workflow configuration file could not be parsed.
    #[error("config error at {path}: {message}")]
    ConfigError { path: String, message: String },
}

impl TaskError {
    /// Whether this error is a refused operation (as opposed to an environment
    /// failure such as unreadable files). The CLI maps refusals to exit code 2.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            TaskError::ValidationError(_)
                | TaskError::IllegalTransition { .. }
                | TaskError::UnreadyDependency { .. }
                | TaskError::IntegrityMismatch { .. }
                | TaskError::DuplicateTask(_)
        )
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        TaskError::IoError {
            path: path.display().to_string(),
            source,
        }
    }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated without exit status".to_string(),
    }
}
