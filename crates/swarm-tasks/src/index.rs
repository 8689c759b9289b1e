// index.rs — ID → task lookup over a task list.
//
// Indexing fails closed on duplicates: the first task with a given ID wins
// and every later one is reported and ignored, never merged. Tasks without
// a usable ID are reported and left out.

use std::collections::HashMap;

use crate::task::Task;

/// Borrowed index of tasks by trimmed ID, in document order.
#[derive(Debug)]
pub struct TaskIndex<'a> {
    order: Vec<&'a str>,
    by_id: HashMap<&'a str, &'a Task>,
    warnings: Vec<String>,
}

impl<'a> TaskIndex<'a> {
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut order = Vec::new();
        let mut by_id = HashMap::new();
        let mut warnings = Vec::new();

        for (position, task) in tasks.iter().enumerate() {
            let Some(id) = task.id_str() else {
                warnings.push(format!("tasks[{}] is missing a non-empty id", position));
                continue;
            };
            if by_id.contains_key(id) {
                warnings.push(format!(
                    "Duplicate task id found: {} (keeping first, ignoring later entries)",
                    id
                ));
                continue;
            }
            by_id.insert(id, task);
            order.push(id);
        }

        Self {
            order,
            by_id,
            warnings,
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a Task> {
        self.by_id.get(id).copied()
    }

    /// The index's own key and task for `id`.
    pub fn entry(&self, id: &str) -> Option<(&'a str, &'a Task)> {
        self.by_id.get_key_value(id).map(|(key, task)| (*key, *task))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Indexed IDs in document order.
    pub fn ids(&self) -> &[&'a str] {
        &self.order
    }

    /// `(id, task)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Task)> + '_ {
        self.order.iter().map(|id| (*id, self.by_id[id]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Duplicate and missing-ID findings.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
