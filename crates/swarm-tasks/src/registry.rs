// registry.rs — Known agents, read from one JSON file per agent.
//
// Each `*.json` file in the agents directory describes one agent with at
// least an `id` and a `role`. The registry is read-only here; it is used to
// list agents and to cross-check task owners during lint.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::TaskError;

/// Shown in place of an agent file's missing or blank `id`.
pub const MISSING_AGENT_ID: &str = "<missing-id>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRecord {
    /// Trimmed `id`, or [`MISSING_AGENT_ID`].
    pub id: String,
    /// Trimmed `role`; empty when absent.
    pub role: String,
    /// File name within the agents directory.
    pub file: String,
}

#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentRecord>,
}

impl AgentRegistry {
    /// Read every `*.json` file in `dir`, sorted by file name.
    pub fn load(dir: &Path) -> Result<Self, TaskError> {
        let entries = fs::read_dir(dir).map_err(|e| TaskError::io(dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| TaskError::io(dir, e))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut agents = Vec::with_capacity(paths.len());
        for path in paths {
            let text = fs::read_to_string(&path).map_err(|e| TaskError::io(&path, e))?;
            let value: Value = serde_json::from_str(&text).map_err(|e| {
                TaskError::MalformedDocument(format!("{}: {}", path.display(), e))
            })?;
            let field = |key: &str| {
                value
                    .get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string()
            };
            let id = field("id");
            agents.push(AgentRecord {
                id: if id.is_empty() { MISSING_AGENT_ID.to_string() } else { id },
                role: field("role"),
                file: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            });
        }
        tracing::debug!(dir = %dir.display(), agents = agents.len(), "loaded agent registry");
        Ok(Self { agents })
    }

    /// Like [`load`](Self::load), but a missing directory is an empty registry.
    pub fn load_or_empty(dir: &Path) -> Result<Self, TaskError> {
        if !dir.exists() {
            return Ok(Self::default());
        }
        Self::load(dir)
    }

    pub fn agents(&self) -> &[AgentRecord] {
        &self.agents
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Uppercase agent IDs, for matching task owners.
    pub fn known_ids(&self) -> BTreeSet<String> {
        self.agents
            .iter()
            .filter(|a| a.id != MISSING_AGENT_ID)
            .map(|a| a.id.to_uppercase())
            .collect()
    }

    /// IDs declared by more than one file, sorted.
    pub fn duplicates(&self) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for agent in &self.agents {
            *counts.entry(agent.id.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(id, _)| id.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_sorted_and_reports_duplicates() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b_coder.json"), r#"{"id": "coder", "role": "Writes code"}"#).unwrap();
        fs::write(dir.path().join("a_planner.json"), r#"{"id": " PLANNER ", "role": "Plans"}"#).unwrap();
        fs::write(dir.path().join("c_copy.json"), r#"{"id": "coder"}"#).unwrap();
        fs::write(dir.path().join("d_blank.json"), r#"{"role": "Nobody"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = AgentRegistry::load(dir.path()).unwrap();
        let files: Vec<_> = registry.agents().iter().map(|a| a.file.as_str()).collect();
        assert_eq!(files, vec!["a_planner.json", "b_coder.json", "c_copy.json", "d_blank.json"]);
        assert_eq!(registry.agents()[0].id, "PLANNER");
        assert_eq!(registry.agents()[3].id, MISSING_AGENT_ID);

        let known: Vec<_> = registry.known_ids().into_iter().collect();
        assert_eq!(known, vec!["CODER", "PLANNER"]);
        assert_eq!(registry.duplicates(), vec!["coder".to_string()]);
    }

    #[test]
    fn missing_directory() {
        let dir = tempdir().unwrap();
        let absent = dir.path().join(".AGENTS");
        assert!(matches!(AgentRegistry::load(&absent), Err(TaskError::IoError { .. })));
        assert!(AgentRegistry::load_or_empty(&absent).unwrap().is_empty());
    }

    #[test]
    fn invalid_json_is_malformed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        assert!(matches!(
            AgentRegistry::load(dir.path()),
            Err(TaskError::MalformedDocument(_))
        ));
    }
}
