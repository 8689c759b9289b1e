// verify.rs — The seam between the lifecycle engine and whatever runs a
// task's verification commands.
//
// The engine only needs to know whether every command passed and, if not,
// which one failed. How commands run (shell, container, CI) is up to the
// implementation.

/// The first verification command that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyFailure {
    pub command: String,
    /// Exit status, or `None` if the command could not be started or was
    /// killed by a signal.
    pub code: Option<i32>,
}

/// Runs a task's verification commands in order, stopping at the first failure.
pub trait VerificationExecutor {
    fn run(&self, task_id: &str, commands: &[String]) -> Result<(), VerifyFailure>;
}

/// Executor used when verification does not apply (starting or blocking a
/// task). Succeeds without running anything.
pub struct NoVerification;

impl VerificationExecutor for NoVerification {
    fn run(&self, task_id: &str, commands: &[String]) -> Result<(), VerifyFailure> {
        tracing::debug!(task_id, count = commands.len(), "verification not run");
        Ok(())
    }
}
