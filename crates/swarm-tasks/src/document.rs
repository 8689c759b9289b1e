// document.rs — TaskDocument: the in-memory form of tasks.json.
//
// The document is `{"tasks": [...], "meta": {...}}`. `meta` carries the
// checksum seal written by every sanctioned save; a seal that no longer
// matches the tasks means someone edited the file directly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::checksum::{self, CHECKSUM_ALGO};
use crate::error::TaskError;
use crate::field::Field;
use crate::task::Task;

pub const SCHEMA_VERSION: u64 = 1;
pub const MANAGED_BY: &str = "agentctl";

/// Fixed schema constants stamped on save and checked by lint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSchema {
    pub schema_version: u64,
    pub managed_by: String,
    pub checksum_algo: String,
}

impl Default for DocumentSchema {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            managed_by: MANAGED_BY.to_string(),
            checksum_algo: CHECKSUM_ALGO.to_string(),
        }
    }
}

/// The `meta` record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreMeta {
    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub schema_version: Field<u64>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub managed_by: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub checksum_algo: Field<String>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub checksum: Field<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole task document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskDocument {
    pub tasks: Vec<Task>,

    #[serde(default, skip_serializing_if = "Field::is_absent")]
    pub meta: Field<StoreMeta>,

    /// Other top-level keys, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskDocument {
    /// Parse a document, failing closed on structural problems.
    ///
    /// Individual fields may still be malformed; those are lint findings,
    /// not parse failures.
    pub fn from_json_str(json: &str) -> Result<Self, TaskError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| TaskError::MalformedDocument(format!("invalid JSON: {}", e)))?;
        let root = value.as_object().ok_or_else(|| {
            TaskError::MalformedDocument("top level must be a JSON object".to_string())
        })?;
        let tasks = root
            .get("tasks")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                TaskError::MalformedDocument(
                    "document must contain a top-level 'tasks' list".to_string(),
                )
            })?;
        if let Some(index) = tasks.iter().position(|task| !task.is_object()) {
            return Err(TaskError::MalformedDocument(format!(
                "tasks[{}] must be an object",
                index
            )));
        }
        // Typed parse from the text, not from `value`: numbers then keep their
        // exact digits through flattened unknown keys.
        serde_json::from_str(json).map_err(|e| TaskError::MalformedDocument(e.to_string()))
    }

    /// Pretty JSON with a trailing newline, the on-disk form.
    pub fn to_json_string(&self) -> Result<String, TaskError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Checksum of the current task list.
    pub fn checksum(&self) -> Result<String, TaskError> {
        checksum::tasks_checksum(&self.tasks)
    }

    /// Stamp schema constants and a fresh checksum into `meta`.
    /// Unknown meta keys are kept.
    pub fn seal(&mut self, schema: &DocumentSchema) -> Result<(), TaskError> {
        let checksum = self.checksum()?;
        let mut meta = match std::mem::take(&mut self.meta) {
            Field::Present(meta) => meta,
            _ => StoreMeta::default(),
        };
        meta.schema_version = Field::Present(schema.schema_version);
        meta.managed_by = Field::Present(schema.managed_by.clone());
        meta.checksum_algo = Field::Present(schema.checksum_algo.clone());
        meta.checksum = Field::Present(checksum);
        self.meta = Field::Present(meta);
        Ok(())
    }

    /// Every problem with the seal, in a stable order. Empty means the
    /// document was last written by a sanctioned save.
    pub fn integrity_findings(&self, schema: &DocumentSchema) -> Result<Vec<TaskError>, TaskError> {
        let meta = match &self.meta {
            Field::Present(meta) => meta,
            _ => {
                return Ok(vec![TaskError::ValidationError(
                    "document is missing a top-level 'meta' object (manual edits are not allowed)"
                        .to_string(),
                )])
            }
        };

        let mut findings = Vec::new();
        if meta.checksum_algo.text() != Some(schema.checksum_algo.as_str()) {
            findings.push(TaskError::ValidationError(format!(
                "meta.checksum_algo must be '{}'",
                schema.checksum_algo
            )));
        }
        if meta.managed_by.text() != Some(schema.managed_by.as_str()) {
            findings.push(TaskError::ValidationError(format!(
                "meta.managed_by must be '{}'",
                schema.managed_by
            )));
        }
        if meta.schema_version.present() != Some(&schema.schema_version) {
            findings.push(TaskError::ValidationError(format!(
                "meta.schema_version must be {}",
                schema.schema_version
            )));
        }
        match meta.checksum.text() {
            None => findings.push(TaskError::ValidationError(
                "meta.checksum is missing/empty".to_string(),
            )),
            Some(recorded) => {
                let computed = self.checksum()?;
                if recorded != computed {
                    findings.push(TaskError::IntegrityMismatch {
                        recorded: recorded.to_string(),
                        computed,
                    });
                }
            }
        }
        Ok(findings)
    }

    /// Fail with the first seal problem, if any.
    pub fn verify_integrity(&self, schema: &DocumentSchema) -> Result<(), TaskError> {
        match self.integrity_findings(schema)?.into_iter().next() {
            Some(finding) => Err(finding),
            None => Ok(()),
        }
    }

    /// First task whose trimmed ID equals `id`.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id_str() == Some(id))
    }

    /// Mutable access to the first task whose trimmed ID equals `id`.
    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id_str() == Some(id))
    }
}
