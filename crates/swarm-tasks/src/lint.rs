// lint.rs — Whole-document validation.
//
// Lint never stops at the first problem: it collects every error and warning
// so a single run shows everything that needs fixing. Errors mean the
// document breaks an invariant (including a broken seal); warnings are
// worth a look but do not fail the run.

use std::collections::BTreeSet;

use crate::document::{DocumentSchema, TaskDocument};
use crate::error::TaskError;
use crate::field::{Entry, Field};
use crate::graph::{format_cycle, DependencyGraph};
use crate::index::TaskIndex;
use crate::task::{CommitInfo, Task, TaskStatus};

/// Owner value that stands for a person rather than a registered agent.
pub const HUMAN_OWNER: &str = "HUMAN";

/// Sorted, de-duplicated lint findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Linter {
    schema: DocumentSchema,
    known_agents: BTreeSet<String>,
}

impl Linter {
    pub fn new(schema: DocumentSchema) -> Self {
        Self {
            schema,
            known_agents: BTreeSet::new(),
        }
    }

    /// Cross-check owners against these agent IDs (uppercase). An empty set
    /// disables the check.
    pub fn with_known_agents(mut self, known_agents: BTreeSet<String>) -> Self {
        self.known_agents = known_agents;
        self
    }

    pub fn lint(&self, doc: &TaskDocument) -> Result<LintReport, TaskError> {
        let mut errors = BTreeSet::new();
        let mut warnings = BTreeSet::new();

        for finding in doc.integrity_findings(&self.schema)? {
            errors.insert(finding.to_string());
        }

        let index = TaskIndex::build(&doc.tasks);
        warnings.extend(index.warnings().iter().cloned());

        let graph = DependencyGraph::build(&index);
        for cycle in graph.cycles() {
            errors.insert(format_cycle(cycle));
        }

        for (task_id, task) in index.iter() {
            self.lint_fields(task_id, task, &mut errors, &mut warnings);

            let Some(state) = graph.state(task_id) else {
                continue;
            };
            for problem in &state.problems {
                errors.insert(format!("{}: {}", task_id, problem));
            }
            if state.self_dependency {
                warnings.insert(format!("{}: depends_on contains itself", task_id));
            }

            let status = task.status();
            if state.is_satisfied() {
                continue;
            }
            if matches!(status, Some(TaskStatus::Doing | TaskStatus::Done)) {
                errors.insert(format!(
                    "{}: status {} but dependencies are not satisfied",
                    task_id,
                    task.status_label()
                ));
            } else {
                if !state.missing.is_empty() {
                    warnings.insert(format!("{}: missing deps: {}", task_id, state.missing.join(", ")));
                }
                if !state.incomplete.is_empty() {
                    warnings.insert(format!(
                        "{}: incomplete deps: {}",
                        task_id,
                        state.incomplete.join(", ")
                    ));
                }
            }
        }

        let report = LintReport {
            errors: errors.into_iter().collect(),
            warnings: warnings.into_iter().collect(),
        };
        tracing::debug!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "lint finished"
        );
        Ok(report)
    }

    fn lint_fields(
        &self,
        task_id: &str,
        task: &Task,
        errors: &mut BTreeSet<String>,
        warnings: &mut BTreeSet<String>,
    ) {
        let status = task.status();
        if status.is_none() {
            errors.insert(format!("{}: invalid status {:?}", task_id, task.status_label()));
        }
        if task.title.text().is_none() {
            errors.insert(format!("{}: title must be a non-empty string", task_id));
        }
        if !task.description.is_optional_text() {
            errors.insert(format!(
                "{}: description must be a non-empty string when present",
                task_id
            ));
        }
        if !task.owner.is_optional_text() {
            errors.insert(format!("{}: owner must be a non-empty string when present", task_id));
        }
        if let Some(owner) = task.owner.text() {
            let owner = owner.to_uppercase();
            if !self.known_agents.is_empty()
                && owner != HUMAN_OWNER
                && !self.known_agents.contains(&owner)
            {
                warnings.insert(format!("{}: owner {:?} is not a known agent id", task_id, owner));
            }
        }
        if !is_string_list(&task.tags) {
            errors.insert(format!("{}: tags must be a list of non-empty strings", task_id));
        }
        if !is_string_list(&task.verify) {
            errors.insert(format!("{}: verify must be a list of non-empty strings", task_id));
        }

        match &task.comments {
            Field::Absent | Field::Null => {}
            Field::Malformed(_) => {
                errors.insert(format!("{}: comments must be a list", task_id));
            }
            Field::Present(comments) => {
                for (idx, entry) in comments.iter().enumerate() {
                    let Entry::Valid(comment) = entry else {
                        errors.insert(format!("{}: comments[{}] must be an object", task_id, idx));
                        continue;
                    };
                    if comment.author.text().is_none() {
                        errors.insert(format!(
                            "{}: comments[{}].author must be a non-empty string",
                            task_id, idx
                        ));
                    }
                    if comment.body.text().is_none() {
                        errors.insert(format!(
                            "{}: comments[{}].body must be a non-empty string",
                            task_id, idx
                        ));
                    }
                }
            }
        }

        if status == Some(TaskStatus::Done) {
            match task.commit.present() {
                None => {
                    errors.insert(format!("{}: DONE tasks must include commit metadata", task_id));
                }
                Some(commit) => {
                    let hash = commit.hash.text().unwrap_or_default();
                    if hash.chars().count() < CommitInfo::MIN_HASH_LEN {
                        errors.insert(format!("{}: commit.hash must be a git hash", task_id));
                    }
                    if commit.message.text().is_none() {
                        errors.insert(format!("{}: commit.message must be non-empty", task_id));
                    }
                }
            }
        }
    }
}

/// Unset, or a list whose every element is a non-blank string.
fn is_string_list(field: &Field<Vec<Entry<String>>>) -> bool {
    match field {
        Field::Absent | Field::Null => true,
        Field::Malformed(_) => false,
        Field::Present(entries) => entries
            .iter()
            .all(|entry| entry.valid().is_some_and(|s| !s.trim().is_empty())),
    }
}
