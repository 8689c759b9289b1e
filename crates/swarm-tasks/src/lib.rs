//! # swarm-tasks
//!
//! Shared task tracking for a team of agents working in one repository.
//!
//! All tasks live in a single JSON document sealed with a SHA-256 checksum,
//! so unsanctioned hand edits are detected. Tasks form a dependency graph
//! and move through a small lifecycle (TODO → DOING → DONE, with BLOCKED on
//! the side) that is gated on readiness, annotated comments, commit
//! metadata, and verification commands.
//!
//! ## Key components
//!
//! - [`TaskDocument`] / [`TaskStore`] — the sealed document and its atomic file store
//! - [`Task`] / [`TaskStatus`] — the task record and its transition table
//! - [`TaskIndex`] / [`DependencyGraph`] — ID lookup, readiness, and cycle detection
//! - [`LifecycleEngine`] — gated status transitions
//! - [`Linter`] — whole-document validation
//! - [`ops`] — sanctioned edits (add, update, comment, scrub, list)
//! - [`AgentRegistry`] — known agents for owner cross-checks
//! - [`VerificationExecutor`] — seam for running a task's verify commands

pub mod checksum;
pub mod config;
pub mod document;
pub mod error;
pub mod field;
pub mod graph;
pub mod index;
pub mod lifecycle;
pub mod lint;
pub mod ops;
pub mod registry;
pub mod store;
pub mod task;
pub mod verify;

pub use config::{GuardConfig, ProjectPaths, WorkflowConfig};
pub use document::{DocumentSchema, StoreMeta, TaskDocument};
pub use error::TaskError;
pub use field::{Entry, Field};
pub use graph::{DependencyGraph, DependencyState, Readiness};
pub use index::TaskIndex;
pub use lifecycle::{
    AnnotationRule, LifecycleEngine, LifecyclePolicy, Note, TransitionOutcome, TransitionRequest,
};
pub use lint::{LintReport, Linter, HUMAN_OWNER};
pub use registry::{AgentRecord, AgentRegistry};
pub use store::TaskStore;
pub use task::{Comment, CommitInfo, CommitRecord, Task, TaskStatus};
pub use verify::{NoVerification, VerificationExecutor, VerifyFailure};
