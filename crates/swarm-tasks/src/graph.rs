// graph.rs — Dependency graph analysis.
//
// The graph is derived, never stored: nodes are indexed task IDs, edges are
// `depends_on` entries that resolve to another indexed task. Dangling
// references are reported as missing rather than becoming edges, and a task
// listing itself is reported as a self-dependency rather than a cycle.
//
// Everything here is pure and runs in O(nodes + edges).

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::field::{Entry, Field};
use crate::index::TaskIndex;
use crate::task::TaskStatus;

/// A `depends_on` value that could not be used as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DependencyProblem {
    /// `depends_on` is not a list; it is treated as empty.
    NotAList,
    /// An entry is not a string; the entry is skipped.
    NonStringEntry,
}

impl fmt::Display for DependencyProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyProblem::NotAList => write!(f, "depends_on must be a list of task IDs"),
            DependencyProblem::NonStringEntry => write!(f, "depends_on entries must be strings"),
        }
    }
}

/// Trimmed, de-duplicated dependency IDs in declared order, plus any
/// problems found while reading them.
pub fn normalize_depends_on(
    field: &Field<Vec<Entry<String>>>,
) -> (Vec<String>, BTreeSet<DependencyProblem>) {
    let mut problems = BTreeSet::new();
    let entries = match field {
        Field::Absent | Field::Null => return (Vec::new(), problems),
        Field::Malformed(_) => {
            problems.insert(DependencyProblem::NotAList);
            return (Vec::new(), problems);
        }
        Field::Present(entries) => entries,
    };

    let mut ids: Vec<String> = Vec::new();
    for entry in entries {
        match entry {
            Entry::Valid(raw) => {
                let id = raw.trim();
                if !id.is_empty() && !ids.iter().any(|seen| seen == id) {
                    ids.push(id.to_string());
                }
            }
            Entry::Invalid(_) => {
                problems.insert(DependencyProblem::NonStringEntry);
            }
        }
    }
    (ids, problems)
}

/// Per-task dependency analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyState {
    /// Normalized `depends_on`.
    pub depends_on: Vec<String>,
    /// Dependencies with no matching task. Sorted, de-duplicated.
    pub missing: Vec<String>,
    /// Dependencies that exist but are not DONE. Sorted, de-duplicated.
    pub incomplete: Vec<String>,
    /// Problems found while reading `depends_on`.
    pub problems: BTreeSet<DependencyProblem>,
    /// The task lists itself as a dependency.
    pub self_dependency: bool,
}

impl DependencyState {
    /// True when every dependency exists and is DONE.
    pub fn is_satisfied(&self) -> bool {
        self.missing.is_empty() && self.incomplete.is_empty()
    }
}

/// Whether a task may start or finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady {
        missing: Vec<String>,
        incomplete: Vec<String>,
    },
    /// No task with this ID is indexed.
    UnknownTask,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}

/// Dependency analysis for a whole task index.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    order: Vec<String>,
    states: HashMap<String, DependencyState>,
    cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn build(index: &TaskIndex<'_>) -> Self {
        let mut states = HashMap::with_capacity(index.len());
        let mut edges: HashMap<&str, Vec<&str>> = HashMap::with_capacity(index.len());

        for (task_id, task) in index.iter() {
            let (depends_on, problems) = normalize_depends_on(&task.depends_on);
            let self_dependency = depends_on.iter().any(|dep| dep == task_id);

            let mut missing = BTreeSet::new();
            let mut incomplete = BTreeSet::new();
            let mut targets = Vec::new();
            for dep_id in &depends_on {
                if dep_id == task_id {
                    continue;
                }
                match index.entry(dep_id) {
                    None => {
                        missing.insert(dep_id.clone());
                    }
                    Some((node, dep)) => {
                        if dep.status() != Some(TaskStatus::Done) {
                            incomplete.insert(dep_id.clone());
                        }
                        targets.push(node);
                    }
                }
            }
            edges.insert(task_id, targets);

            states.insert(
                task_id.to_string(),
                DependencyState {
                    depends_on,
                    missing: missing.into_iter().collect(),
                    incomplete: incomplete.into_iter().collect(),
                    problems,
                    self_dependency,
                },
            );
        }

        let cycles = detect_cycles(index.ids(), &edges);
        Self {
            order: index.ids().iter().map(|id| id.to_string()).collect(),
            states,
            cycles,
        }
    }

    pub fn state(&self, task_id: &str) -> Option<&DependencyState> {
        self.states.get(task_id)
    }

    /// `(id, state)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DependencyState)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.states.get(id).map(|state| (id.as_str(), state)))
    }

    pub fn readiness(&self, task_id: &str) -> Readiness {
        match self.states.get(task_id) {
            None => Readiness::UnknownTask,
            Some(state) if state.is_satisfied() => Readiness::Ready,
            Some(state) => Readiness::NotReady {
                missing: state.missing.clone(),
                incomplete: state.incomplete.clone(),
            },
        }
    }

    /// Every cycle found, each as a closed path (`A -> B -> A`).
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// Structural findings: unusable `depends_on` values, self-dependencies,
    /// and cycles. Readiness is reported separately.
    pub fn findings(&self) -> Vec<String> {
        let mut findings = Vec::new();
        for (task_id, state) in self.iter() {
            if !state.problems.is_empty() {
                let text: Vec<String> = state.problems.iter().map(|p| p.to_string()).collect();
                findings.push(format!("{}: {}", task_id, text.join("; ")));
            }
            if state.self_dependency {
                findings.push(format!("{}: depends_on contains itself", task_id));
            }
        }
        for cycle in &self.cycles {
            findings.push(format_cycle(cycle));
        }
        findings
    }
}

pub fn format_cycle(cycle: &[String]) -> String {
    format!("Dependency cycle detected: {}", cycle.join(" -> "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Find cycles with an iterative three-colour depth-first search.
///
/// Roots are tried in `nodes` order and edges followed in list order. When
/// an edge reaches a node that is still in progress, the path from that
/// node's position on the stack through the repeated node is reported.
/// Edges to nodes outside `nodes` are ignored. Every back edge yields one
/// cycle, so overlapping cycles are all reported.
pub fn detect_cycles<'a>(nodes: &[&'a str], edges: &HashMap<&'a str, Vec<&'a str>>) -> Vec<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = nodes.iter().map(|node| (*node, Mark::Unvisited)).collect();
    let mut cycles = Vec::new();

    for &root in nodes {
        if marks.get(root) != Some(&Mark::Unvisited) {
            continue;
        }
        // Each frame is a node on the current path and the index of the next
        // edge to follow from it.
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::InProgress);

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let next = edges.get(node).and_then(|targets| targets.get(frame.1)).copied();
            let Some(dep) = next else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match marks.get(dep).copied() {
                Some(Mark::Unvisited) => {
                    marks.insert(dep, Mark::InProgress);
                    stack.push((dep, 0));
                }
                Some(Mark::InProgress) => {
                    if let Some(start) = stack.iter().position(|(on_path, _)| *on_path == dep) {
                        let mut cycle: Vec<String> =
                            stack[start..].iter().map(|(n, _)| n.to_string()).collect();
                        cycle.push(dep.to_string());
                        cycles.push(cycle);
                    }
                }
                Some(Mark::Done) | None => {}
            }
        }
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::string_list;
    use crate::task::Task;

    fn task(id: &str, status: TaskStatus, deps: &[&str]) -> Task {
        let mut t = Task::new(id, format!("Task {}", id));
        t.set_status(status);
        t.depends_on = string_list(deps.iter().map(|d| d.to_string()).collect());
        t
    }

    fn graph(tasks: &[Task]) -> DependencyGraph {
        DependencyGraph::build(&TaskIndex::build(tasks))
    }

    #[test]
    fn three_node_cycle_in_traversal_order() {
        let tasks = vec![
            task("A", TaskStatus::Todo, &["B"]),
            task("B", TaskStatus::Todo, &["C"]),
            task("C", TaskStatus::Todo, &["A"]),
        ];
        let g = graph(&tasks);
        let expected: Vec<String> = ["A", "B", "C", "A"].iter().map(|s| s.to_string()).collect();
        assert_eq!(g.cycles().to_vec(), vec![expected]);
    }

    #[test]
    fn deep_chain_has_no_cycles() {
        let ids: Vec<String> = (0..500).map(|i| format!("T-{}", i)).collect();
        let tasks: Vec<Task> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let deps: Vec<&str> = if i + 1 < ids.len() { vec![ids[i + 1].as_str()] } else { vec![] };
                task(id, TaskStatus::Todo, &deps)
            })
            .collect();
        let g = graph(&tasks);
        assert!(g.cycles().is_empty());
        assert_eq!(g.readiness("T-499"), Readiness::Ready);
    }

    #[test]
    fn self_loop_is_self_dependency_not_cycle() {
        let tasks = vec![task("A", TaskStatus::Todo, &["A"])];
        let g = graph(&tasks);
        assert!(g.cycles().is_empty());
        let state = g.state("A").unwrap();
        assert!(state.self_dependency);
        assert!(state.missing.is_empty());
        assert!(state.incomplete.is_empty());
        assert_eq!(g.findings(), vec!["A: depends_on contains itself".to_string()]);
    }

    #[test]
    fn overlapping_cycles_are_all_reported() {
        // A -> B -> A and A -> B -> C -> A share the A -> B edge.
        let tasks = vec![
            task("A", TaskStatus::Todo, &["B"]),
            task("B", TaskStatus::Todo, &["A", "C"]),
            task("C", TaskStatus::Todo, &["A"]),
        ];
        let g = graph(&tasks);
        let rendered: Vec<String> = g.cycles().iter().map(|c| c.join(">")).collect();
        assert_eq!(rendered, vec!["A>B>A", "A>B>C>A"]);
    }

    #[test]
    fn dangling_edges_do_not_participate() {
        let tasks = vec![
            task("A", TaskStatus::Todo, &["GHOST", "B"]),
            task("B", TaskStatus::Done, &[]),
        ];
        let g = graph(&tasks);
        assert!(g.cycles().is_empty());
        assert_eq!(
            g.readiness("A"),
            Readiness::NotReady {
                missing: vec!["GHOST".to_string()],
                incomplete: vec![],
            }
        );
    }

    #[test]
    fn empty_graph_has_no_cycles() {
        assert!(graph(&[]).cycles().is_empty());
        assert!(detect_cycles(&["A", "B"], &HashMap::new()).is_empty());
    }

    #[test]
    fn readiness_follows_dependency_status() {
        let mut tasks = vec![
            task("T-1", TaskStatus::Done, &[]),
            task("T-2", TaskStatus::Todo, &["T-1"]),
        ];
        assert!(graph(&tasks).readiness("T-2").is_ready());

        tasks[0].set_status(TaskStatus::Doing);
        assert_eq!(
            graph(&tasks).readiness("T-2"),
            Readiness::NotReady {
                missing: vec![],
                incomplete: vec!["T-1".to_string()],
            }
        );
        assert_eq!(graph(&tasks).readiness("T-404"), Readiness::UnknownTask);
    }

    #[test]
    fn non_string_entries_degrade_to_valid_ids() {
        let t: Task = serde_json::from_value(serde_json::json!({
            "id": "A",
            "depends_on": ["B", 7, " B ", "C"],
        }))
        .unwrap();
        let (ids, problems) = normalize_depends_on(&t.depends_on);
        assert_eq!(ids, vec!["B".to_string(), "C".to_string()]);
        assert!(problems.contains(&DependencyProblem::NonStringEntry));

        let tasks = vec![t];
        let g = graph(&tasks);
        assert_eq!(
            g.findings(),
            vec!["A: depends_on entries must be strings".to_string()]
        );
        assert_eq!(g.state("A").unwrap().missing, vec!["B", "C"]);
    }
}
