//! Pre-commit guardrails for agents sharing one work tree
//!
//! Several agents may edit the same checkout at once, so a commit for one
//! task must contain only that task's files. The guard checks the staged set
//! against an allowlist of path prefixes, keeps protected files (the task
//! document) out unless explicitly allowed, and insists on a commit message
//! that names the task and says what changed.

use std::sync::OnceLock;

use regex::Regex;

use crate::adapter::{Result, StagingArea, SubmitError};

/// Words that do not count as a summary on their own.
pub const GENERIC_COMMIT_TOKENS: &[&str] =
    &["start", "status", "mark", "done", "wip", "update", "tasks", "task"];

/// Whether `message` says something beyond the task ID and generic words.
///
/// Tokens are runs of Latin or Cyrillic letters and digits, optionally
/// joined by hyphens (so `T-12` is one token). Comparison is case-insensitive.
pub fn commit_message_has_meaningful_summary(task_id: &str, message: &str) -> Result<bool> {
    let task_token = task_id.trim().to_lowercase();
    if task_token.is_empty() {
        return Ok(true);
    }
    let lowered = message.to_lowercase();
    Ok(token_regex()?
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .any(|token| token != task_token && !GENERIC_COMMIT_TOKENS.contains(&token)))
}

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

/// Commit-message token pattern, compiled once per process.
fn token_regex() -> Result<&'static Regex> {
    if let Some(re) = TOKEN_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(r"[0-9A-Za-zА-Яа-яЁё]+(?:-[0-9A-Za-zА-Яа-яЁё]+)*")?;
    Ok(TOKEN_RE.get_or_init(|| re))
}

/// Whether `path` equals `prefix` or lies under it. Leading `./` and `/`
/// are ignored on both sides; an empty prefix matches nothing.
pub fn path_is_under(path: &str, prefix: &str) -> bool {
    let path = strip_leading(path.trim());
    let root = strip_leading(prefix.trim()).trim_end_matches('/');
    if root.is_empty() {
        return false;
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn strip_leading(mut path: &str) -> &str {
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            return path;
        }
    }
}

/// What a commit for one task is allowed to contain.
#[derive(Debug, Clone, Default)]
pub struct GuardRequest {
    pub task_id: String,
    pub message: String,
    /// Path prefixes the staged files must fall under. At least one is required.
    pub allow: Vec<String>,
    /// Permit staging protected paths.
    pub allow_protected: bool,
    /// Fail when the work tree has unstaged changes.
    pub require_clean: bool,
}

/// A passed guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardReport {
    pub staged: Vec<String>,
    /// Unstaged paths that were tolerated (other agents' work in progress).
    pub unstaged: Vec<String>,
}

/// Checks the staging area before a task commit.
#[derive(Debug, Clone)]
pub struct CommitGuard {
    protected_paths: Vec<String>,
}

impl Default for CommitGuard {
    fn default() -> Self {
        Self::new(vec!["tasks.json".to_string()])
    }
}

impl CommitGuard {
    pub fn new(protected_paths: Vec<String>) -> Self {
        Self { protected_paths }
    }

    /// Fails if anything is staged.
    pub fn check_clean(&self, tree: &dyn StagingArea) -> Result<()> {
        let staged = tree.staged_files()?;
        if staged.is_empty() {
            return Ok(());
        }
        Err(SubmitError::GuardViolation(format!(
            "index is not clean; staged: {}",
            staged.join(", ")
        )))
    }

    /// Run every commit rule for `request`, failing at the first one broken.
    pub fn check(&self, tree: &dyn StagingArea, request: &GuardRequest) -> Result<GuardReport> {
        let task_id = request.task_id.trim();
        if !request.message.contains(task_id) {
            return Err(violation(format!("commit message must include {}", task_id)));
        }
        if !commit_message_has_meaningful_summary(task_id, &request.message)? {
            return Err(violation(format!(
                "commit message is too generic; include a short summary, e.g. \"{} Add X (no network)\"",
                task_id
            )));
        }

        let staged = tree.staged_files()?;
        if staged.is_empty() {
            return Err(violation("no staged files".to_string()));
        }
        if request.allow.iter().all(|prefix| prefix.trim().is_empty()) {
            return Err(violation("provide at least one --allow <path> prefix".to_string()));
        }

        let unstaged = tree.unstaged_files()?;
        if request.require_clean && !unstaged.is_empty() {
            return Err(violation(format!(
                "working tree is dirty; unstaged: {}",
                unstaged.join(", ")
            )));
        }
        if !unstaged.is_empty() {
            tracing::warn!(count = unstaged.len(), "ignoring unstaged files in a shared work tree");
        }

        for path in &staged {
            if !request.allow_protected && self.is_protected(path) {
                return Err(violation(format!(
                    "staged file is forbidden by default: {} (use --allow-tasks to override)",
                    path
                )));
            }
            if !request.allow.iter().any(|prefix| path_is_under(path, prefix)) {
                return Err(violation(format!("staged file is outside allowlist: {}", path)));
            }
        }

        tracing::info!(task_id, staged = staged.len(), "commit guard passed");
        Ok(GuardReport { staged, unstaged })
    }

    fn is_protected(&self, path: &str) -> bool {
        self.protected_paths
            .iter()
            .any(|protected| path_is_under(path, protected))
    }
}

fn violation(message: String) -> SubmitError {
    SubmitError::GuardViolation(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeTree {
        staged: Vec<&'static str>,
        unstaged: Vec<&'static str>,
    }

    impl StagingArea for FakeTree {
        fn staged_files(&self) -> Result<Vec<String>> {
            Ok(self.staged.iter().map(|s| s.to_string()).collect())
        }

        fn unstaged_files(&self) -> Result<Vec<String>> {
            Ok(self.unstaged.iter().map(|s| s.to_string()).collect())
        }
    }

    fn request(message: &str, allow: &[&str]) -> GuardRequest {
        GuardRequest {
            task_id: "T-12".into(),
            message: message.into(),
            allow: allow.iter().map(|s| s.to_string()).collect(),
            ..GuardRequest::default()
        }
    }

    fn tree(staged: Vec<&'static str>) -> FakeTree {
        FakeTree {
            staged,
            unstaged: vec![],
        }
    }

    #[test]
    fn meaningful_summary() {
        assert!(!commit_message_has_meaningful_summary("T-12", "T-12 done").unwrap());
        assert!(!commit_message_has_meaningful_summary("T-12", "WIP: t-12 task update").unwrap());
        assert!(commit_message_has_meaningful_summary("T-12", "T-12 add parser").unwrap());
        assert!(commit_message_has_meaningful_summary("T-12", "T-12 исправить парсер").unwrap());
        assert!(commit_message_has_meaningful_summary("", "done").unwrap());
    }

    #[test]
    fn token_pattern_is_compiled_once() {
        let first = token_regex().unwrap();
        let second = token_regex().unwrap();
        assert!(std::ptr::eq(first, second));
        assert!(first.is_match("T-12"));
    }

    #[test]
    fn prefix_matching() {
        assert!(path_is_under("src/lib.rs", "src"));
        assert!(path_is_under("src/lib.rs", "./src/"));
        assert!(path_is_under("src", "src"));
        assert!(!path_is_under("srcx/lib.rs", "src"));
        assert!(!path_is_under("src/lib.rs", ""));
        assert!(!path_is_under("src/lib.rs", "./"));
        assert!(path_is_under(".github/workflows/ci.yml", ".github"));
    }

    #[test]
    fn passing_commit() {
        let guard = CommitGuard::default();
        let tree = FakeTree {
            staged: vec!["src/lib.rs", "docs/parser.md"],
            unstaged: vec!["other/agent.rs"],
        };
        let report = guard
            .check(&tree, &request("T-12 add parser", &["src", "docs"]))
            .unwrap();
        assert_eq!(report.staged.len(), 2);
        assert_eq!(report.unstaged, vec!["other/agent.rs"]);
    }

    #[test]
    fn rules_are_enforced() {
        let guard = CommitGuard::default();
        let cases: Vec<(FakeTree, GuardRequest, &str)> = vec![
            (tree(vec!["src/a.rs"]), request("add parser", &["src"]), "must include"),
            (tree(vec!["src/a.rs"]), request("T-12 done", &["src"]), "too generic"),
            (tree(vec![]), request("T-12 add parser", &["src"]), "no staged files"),
            (tree(vec!["src/a.rs"]), request("T-12 add parser", &[]), "--allow"),
            (tree(vec!["tasks.json"]), request("T-12 add parser", &["."]), "forbidden by default"),
            (tree(vec!["lib/a.rs"]), request("T-12 add parser", &["src"]), "outside allowlist"),
        ];
        for (tree, req, expected) in cases {
            match guard.check(&tree, &req) {
                Err(SubmitError::GuardViolation(msg)) => {
                    assert!(msg.contains(expected), "{:?} does not contain {:?}", msg, expected)
                }
                other => panic!("expected violation containing {:?}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn protected_paths_and_clean_tree() {
        let guard = CommitGuard::default();
        let mut req = request("T-12 record status", &["tasks.json"]);
        req.allow_protected = true;
        assert!(guard.check(&tree(vec!["tasks.json"]), &req).is_ok());

        let dirty = FakeTree {
            staged: vec!["tasks.json"],
            unstaged: vec!["src/wip.rs"],
        };
        req.require_clean = true;
        assert!(matches!(guard.check(&dirty, &req), Err(SubmitError::GuardViolation(_))));

        assert!(guard.check_clean(&tree(vec![])).is_ok());
        assert!(guard.check_clean(&tree(vec!["src/a.rs"])).unwrap_err().is_refusal());
    }
}
