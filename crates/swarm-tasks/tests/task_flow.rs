// task_flow.rs — End-to-end flows through the store, graph, lifecycle
// engine, and linter.
//
// Every step goes through the file on disk: load for update, transition,
// save, reload. This catches anything that only works in memory (seal
// refresh, preserved unknown keys, readiness recomputed from stored status).

use std::cell::RefCell;
use std::fs;

use tempfile::tempdir;

use swarm_tasks::field::string_list;
use swarm_tasks::ops::{add_task, NewTask};
use swarm_tasks::{
    CommitInfo, DependencyGraph, DocumentSchema, LifecycleEngine, Linter, NoVerification,
    Readiness, Task, TaskError, TaskIndex, TaskStatus, TaskStore, TransitionRequest,
    VerificationExecutor, VerifyFailure,
};

const START_NOTE: &str = "Start: wiring the store into the CLI and adding tests";

/// Test double that records every command it is asked to run.
#[derive(Default)]
struct RecordingVerifier {
    calls: RefCell<Vec<(String, Vec<String>)>>,
    fail_on: Option<String>,
}

impl VerificationExecutor for RecordingVerifier {
    fn run(&self, task_id: &str, commands: &[String]) -> Result<(), VerifyFailure> {
        self.calls
            .borrow_mut()
            .push((task_id.to_string(), commands.to_vec()));
        if let Some(bad) = &self.fail_on {
            if let Some(command) = commands.iter().find(|c| *c == bad) {
                return Err(VerifyFailure {
                    command: command.clone(),
                    code: Some(2),
                });
            }
        }
        Ok(())
    }
}

fn readiness(store: &TaskStore, id: &str) -> Readiness {
    let doc = store.load_sealed().unwrap();
    let index = TaskIndex::build(&doc.tasks);
    DependencyGraph::build(&index).readiness(id)
}

fn transition(
    store: &TaskStore,
    id: &str,
    request: TransitionRequest,
    verifier: &dyn VerificationExecutor,
) -> Result<(), TaskError> {
    let engine = LifecycleEngine::default();
    let mut doc = store.load_for_update(false)?;
    engine.transition(&mut doc, id, request, verifier)?;
    store.save(&mut doc)
}

fn seeded_store(dir: &std::path::Path, tasks: Vec<Task>) -> TaskStore {
    let store = TaskStore::new(dir.join("tasks.json"));
    let mut doc = store.init().unwrap();
    doc.tasks = tasks;
    store.save(&mut doc).unwrap();
    store
}

#[test]
fn two_task_chain_end_to_end() {
    let dir = tempdir().unwrap();
    let mut t2 = Task::new("T-2", "Second");
    t2.depends_on = string_list(vec!["T-1".into()]);
    let mut t1 = Task::new("T-1", "First");
    t1.verify = string_list(vec!["cargo test".into()]);
    let store = seeded_store(dir.path(), vec![t1, t2]);

    assert_eq!(readiness(&store, "T-1"), Readiness::Ready);
    assert_eq!(
        readiness(&store, "T-2"),
        Readiness::NotReady {
            missing: vec![],
            incomplete: vec!["T-1".to_string()]
        }
    );

    transition(
        &store,
        "T-1",
        TransitionRequest::new(TaskStatus::Doing).with_note("CODER", START_NOTE),
        &NoVerification,
    )
    .unwrap();

    let verifier = RecordingVerifier::default();
    transition(
        &store,
        "T-1",
        TransitionRequest::new(TaskStatus::Done)
            .with_commit(CommitInfo::new("abcdef1234", "T-1 done")),
        &verifier,
    )
    .unwrap();
    assert_eq!(
        *verifier.calls.borrow(),
        vec![("T-1".to_string(), vec!["cargo test".to_string()])]
    );

    assert_eq!(readiness(&store, "T-2"), Readiness::Ready);
    transition(
        &store,
        "T-2",
        TransitionRequest::new(TaskStatus::Doing).with_note("CODER", START_NOTE),
        &NoVerification,
    )
    .unwrap();

    let doc = store.load_sealed().unwrap();
    let t1 = doc.task("T-1").unwrap();
    assert_eq!(t1.status(), Some(TaskStatus::Done));
    assert_eq!(t1.commit.present().unwrap().message.text(), Some("T-1 done"));
    assert_eq!(t1.comment_list().len(), 1);
    assert_eq!(doc.task("T-2").unwrap().status(), Some(TaskStatus::Doing));

    let report = Linter::new(DocumentSchema::default()).lint(&doc).unwrap();
    assert!(report.is_ok(), "{:?}", report);
}

#[test]
fn missing_dependency_refuses_start() {
    let dir = tempdir().unwrap();
    let mut t3 = Task::new("T-3", "Depends on a ghost");
    t3.depends_on = string_list(vec!["T-99".into()]);
    let store = seeded_store(dir.path(), vec![t3]);

    assert_eq!(
        readiness(&store, "T-3"),
        Readiness::NotReady {
            missing: vec!["T-99".to_string()],
            incomplete: vec![]
        }
    );
    let err = transition(
        &store,
        "T-3",
        TransitionRequest::new(TaskStatus::Doing).with_note("CODER", START_NOTE),
        &NoVerification,
    )
    .unwrap_err();
    assert!(matches!(err, TaskError::UnreadyDependency { .. }));
    assert!(err.is_refusal());

    let doc = store.load_sealed().unwrap();
    assert_eq!(doc.task("T-3").unwrap().status(), Some(TaskStatus::Todo));
}

#[test]
fn failed_verification_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let mut t1 = Task::new("T-1", "First");
    t1.set_status(TaskStatus::Doing);
    t1.verify = string_list(vec!["cargo test".into(), "cargo clippy".into()]);
    let store = seeded_store(dir.path(), vec![t1]);
    let before = fs::read_to_string(store.path()).unwrap();

    let verifier = RecordingVerifier {
        fail_on: Some("cargo clippy".to_string()),
        ..RecordingVerifier::default()
    };
    let err = transition(
        &store,
        "T-1",
        TransitionRequest::new(TaskStatus::Done)
            .with_commit(CommitInfo::new("abcdef1234", "T-1 done")),
        &verifier,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TaskError::ExternalCommandFailure { code: Some(2), .. }
    ));
    assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
}

#[test]
fn hand_edit_blocks_sanctioned_writes() {
    let dir = tempdir().unwrap();
    let store = seeded_store(dir.path(), vec![Task::new("T-1", "First")]);

    let text = fs::read_to_string(store.path()).unwrap();
    fs::write(store.path(), text.replace("\"TODO\"", "\"DONE\"")).unwrap();

    let err = transition(
        &store,
        "T-1",
        TransitionRequest::new(TaskStatus::Blocked)
            .with_note("CODER", "Blocked: waiting for the API review to complete"),
        &NoVerification,
    )
    .unwrap_err();
    assert!(matches!(err, TaskError::IntegrityMismatch { .. }));

    let doc = store.load().unwrap();
    let report = Linter::new(DocumentSchema::default()).lint(&doc).unwrap();
    assert!(report
        .errors
        .iter()
        .any(|e| e.contains("does not match tasks payload")));
}

#[test]
fn unknown_keys_survive_a_transition() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let store = TaskStore::new(&path);
    store.init().unwrap();

    let mut doc = store.load_sealed().unwrap();
    add_task(
        &mut doc,
        NewTask {
            id: "T-1".into(),
            title: "First".into(),
            ..NewTask::default()
        },
    )
    .unwrap();
    doc.tasks[0]
        .extra
        .insert("estimate".into(), serde_json::json!({"points": 3}));
    doc.extra
        .insert("project".into(), serde_json::json!("swarm"));
    store.save(&mut doc).unwrap();

    transition(
        &store,
        "T-1",
        TransitionRequest::new(TaskStatus::Doing).with_note("CODER", START_NOTE),
        &NoVerification,
    )
    .unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["project"], "swarm");
    assert_eq!(raw["tasks"][0]["estimate"]["points"], 3);
    assert_eq!(raw["tasks"][0]["status"], "DOING");
    assert_eq!(raw["meta"]["managed_by"], "agentctl");
}
