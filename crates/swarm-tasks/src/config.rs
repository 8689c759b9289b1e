// config.rs — Project layout and workflow configuration.
//
// ProjectPaths says where a project keeps its task document, agent files,
// and workflow config. WorkflowConfig is read from `.agentctl/workflow.toml`
// and tunes the lifecycle policy and commit guard; every key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TaskError;
use crate::lifecycle::LifecyclePolicy;

/// File locations for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectPaths {
    /// Root directory of the project (git work tree, verify commands' cwd).
    pub root: PathBuf,

    /// The shared task document.
    pub tasks_file: PathBuf,

    /// One JSON file per known agent.
    pub agents_dir: PathBuf,

    /// Optional workflow configuration.
    pub workflow_config: PathBuf,
}

impl ProjectPaths {
    /// Standard layout for a project rooted at `project_root`.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        Self {
            tasks_file: root.join("tasks.json"),
            agents_dir: root.join(".AGENTS"),
            workflow_config: root.join(".agentctl").join("workflow.toml"),
            root,
        }
    }
}

/// Top-level workflow configuration from .agentctl/workflow.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Annotation rules and commit-subject requirement.
    #[serde(default)]
    pub lifecycle: LifecyclePolicy,

    /// Commit guard settings.
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Commit guard configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Paths that may only be committed with `--allow-tasks`.
    #[serde(default = "default_protected_paths")]
    pub protected_paths: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_paths: default_protected_paths(),
        }
    }
}

fn default_protected_paths() -> Vec<String> {
    vec!["tasks.json".to_string()]
}

impl WorkflowConfig {
    /// Load workflow config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, TaskError> {
        let content = std::fs::read_to_string(path).map_err(|e| TaskError::io(path, e))?;
        toml::from_str(&content).map_err(|e| TaskError::ConfigError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Defaults when the file does not exist; a file that exists but cannot
    /// be parsed is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, TaskError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn for_project_layout() {
        let paths = ProjectPaths::for_project("/work/repo");
        assert_eq!(paths.tasks_file, PathBuf::from("/work/repo/tasks.json"));
        assert_eq!(paths.agents_dir, PathBuf::from("/work/repo/.AGENTS"));
        assert_eq!(
            paths.workflow_config,
            PathBuf::from("/work/repo/.agentctl/workflow.toml")
        );
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = WorkflowConfig::load_or_default(&dir.path().join("workflow.toml")).unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert_eq!(config.lifecycle.start.min_chars, 40);
        assert_eq!(config.guard.protected_paths, vec!["tasks.json"]);
    }

    #[test]
    fn partial_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workflow.toml");
        std::fs::write(
            &path,
            r#"
[lifecycle]
require_task_id_in_commit = false

[lifecycle.finish]
prefix = "Checked:"
min_chars = 20

[guard]
protected_paths = ["tasks.json", ".AGENTS"]
"#,
        )
        .unwrap();

        let config = WorkflowConfig::load(&path).unwrap();
        assert!(!config.lifecycle.require_task_id_in_commit);
        assert_eq!(config.lifecycle.finish.prefix, "Checked:");
        assert_eq!(config.lifecycle.start, LifecyclePolicy::default().start);
        assert_eq!(config.guard.protected_paths.len(), 2);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workflow.toml");
        std::fs::write(&path, "[lifecycle\nbroken").unwrap();
        assert!(matches!(
            WorkflowConfig::load_or_default(&path),
            Err(TaskError::ConfigError { .. })
        ));
    }
}
