//! Seam to the subsystem that performs container actions.

use std::process::{Command, Stdio};

use camino::{Utf8Path, Utf8PathBuf};
use strum::Display;
use thiserror::Error;
use tracing::debug;

use super::BRIDGE_TARGET;
use super::invocation::CommandInvocation;

/// Environment inherited from a supervisor that must not reach children.
const SUPERVISOR_ENV: &[&str] = &["LISTEN_PID", "LISTEN_FDS", "LISTEN_FDNAMES", "NOTIFY_SOCKET"];

/// Executes command invocations.
///
/// Implementations run synchronously and may block for as long as the action
/// takes; callers schedule them on a blocking worker.
pub trait ActionPipeline: Send + Sync {
    /// Runs `invocation` to completion.
    fn execute(&self, invocation: &CommandInvocation) -> CommandResult;
}

/// Broad class of an action failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ActionErrorKind {
    /// The invocation was rejected as malformed.
    InvalidArgument,
    /// The referenced object does not exist.
    NotFound,
    /// The object is in a state that forbids the action.
    Conflict,
    /// Any other failure.
    Failed,
}

impl ActionErrorKind {
    /// Classifies a diagnostic emitted by the command pipeline.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        let message = message.to_ascii_lowercase();
        let mentions = |needles: &[&str]| needles.iter().any(|needle| message.contains(needle));
        if mentions(&["no such", "not found"]) {
            Self::NotFound
        } else if mentions(&["already exists", "already in use", "is running"]) {
            Self::Conflict
        } else if mentions(&["unknown flag", "invalid", "requires at least"]) {
            Self::InvalidArgument
        } else {
            Self::Failed
        }
    }
}

/// Failure reported by the command pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    kind: ActionErrorKind,
    message: String,
}

impl ActionError {
    /// Builds an error of `kind`.
    #[must_use]
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Builds an error whose kind is inferred from `message`.
    #[must_use]
    pub fn classified(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ActionErrorKind::classify(&message),
            message,
        }
    }

    /// Failure class.
    #[must_use]
    pub const fn kind(&self) -> ActionErrorKind {
        self.kind
    }

    /// Diagnostic text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Failure, when the action did not succeed.
    pub error: Option<ActionError>,
    /// Standard output captured from the action.
    pub output: Vec<u8>,
}

impl CommandResult {
    /// Successful result carrying `output`.
    #[must_use]
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            error: None,
            output: output.into(),
        }
    }

    /// Failed result.
    #[must_use]
    pub const fn failure(error: ActionError) -> Self {
        Self {
            error: Some(error),
            output: Vec::new(),
        }
    }

    /// Converts into the captured output or the failure.
    ///
    /// # Errors
    ///
    /// Returns the [`ActionError`] when the action failed.
    pub fn into_result(self) -> Result<Vec<u8>, ActionError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.output),
        }
    }
}

/// Pipeline that runs the `nerdctl` program as a child process.
#[derive(Debug, Clone)]
pub struct ExecPipeline {
    program: Utf8PathBuf,
}

impl ExecPipeline {
    /// Pipeline executing `program`.
    #[must_use]
    pub fn new(program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program being executed.
    #[must_use]
    pub fn program(&self) -> &Utf8Path {
        &self.program
    }
}

impl ActionPipeline for ExecPipeline {
    fn execute(&self, invocation: &CommandInvocation) -> CommandResult {
        let context = invocation.context();
        debug!(
            target: BRIDGE_TARGET,
            request_id = %context.request_id(),
            program = %self.program,
            argv = ?invocation.argv(),
            "executing action"
        );
        let mut command = Command::new(self.program.as_std_path());
        command.args(invocation.argv()).stdin(Stdio::null());
        for key in SUPERVISOR_ENV {
            command.env_remove(key);
        }
        let output = match command.output() {
            Ok(output) => output,
            Err(error) => {
                return CommandResult::failure(ActionError::new(
                    ActionErrorKind::Failed,
                    format!("failed to execute {}: {error}", self.program),
                ));
            }
        };
        if output.status.success() {
            return CommandResult::success(output.stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr.trim();
        let error = if message.is_empty() {
            ActionError::new(
                ActionErrorKind::Failed,
                format!("{} exited with {}", self.program, output.status),
            )
        } else {
            ActionError::classified(message)
        };
        CommandResult {
            error: Some(error),
            output: output.stdout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use crate::bridge::{ExecutionContext, Operation};

    fn invocation(argv: &[&str]) -> CommandInvocation {
        CommandInvocation::new(
            argv.iter().map(|arg| (*arg).to_owned()).collect(),
            std::collections::BTreeMap::new(),
            ExecutionContext::new("1.43", Operation::ContainerStart),
        )
    }

    #[rstest]
    #[case("Error: no such container: web", ActionErrorKind::NotFound)]
    #[case("image not found", ActionErrorKind::NotFound)]
    #[case("name \"web\" is already used ... already exists", ActionErrorKind::Conflict)]
    #[case("container web is running", ActionErrorKind::Conflict)]
    #[case("unknown flag: --bogus", ActionErrorKind::InvalidArgument)]
    #[case("requires at least 1 arg(s)", ActionErrorKind::InvalidArgument)]
    #[case("connection refused", ActionErrorKind::Failed)]
    fn classifies_diagnostics(#[case] message: &str, #[case] expected: ActionErrorKind) {
        assert_eq!(ActionErrorKind::classify(message), expected);
    }

    #[test]
    fn successful_program_yields_stdout() {
        let pipeline = ExecPipeline::new("echo");
        let result = pipeline.execute(&invocation(&["abc123"]));
        assert_eq!(result.into_result().expect("echo succeeds"), b"abc123\n");
    }

    #[test]
    fn failing_program_reports_classified_stderr() {
        let pipeline = ExecPipeline::new("sh");
        let result = pipeline.execute(&invocation(&[
            "-c",
            "echo 'Error: no such container: web' >&2; exit 1",
        ]));
        let error = result.into_result().expect_err("program fails");
        assert_eq!(error.kind(), ActionErrorKind::NotFound);
        assert_eq!(error.message(), "Error: no such container: web");
    }

    #[test]
    fn silent_failure_reports_exit_status() {
        let pipeline = ExecPipeline::new("false");
        let error = pipeline
            .execute(&invocation(&[]))
            .into_result()
            .expect_err("false fails");
        assert_eq!(error.kind(), ActionErrorKind::Failed);
        assert!(error.message().contains("exited with"));
    }

    #[test]
    fn missing_program_fails() {
        let pipeline = ExecPipeline::new("/nonexistent/nerdctl");
        let error = pipeline
            .execute(&invocation(&["ps"]))
            .into_result()
            .expect_err("program missing");
        assert_eq!(error.kind(), ActionErrorKind::Failed);
    }
}
