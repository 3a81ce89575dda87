//! Command execution.
//!
//! An [`Invocation`] is the fully built, shell-free description of a single
//! run: resolved program, argument vector, pinned environment, working
//! directory, deadline and output budget. [`ProcessExecutor`] spawns it in
//! its own process group, captures bounded output, and kills the whole group
//! when the deadline passes. [`ChildGroups`] lets the daemon kill groups still
//! running when shutdown gives up waiting.
//!
//! The [`CommandExecutor`] trait is the seam used by the dispatcher so tests
//! can observe invocations without spawning processes.

mod argv;
mod capture;
mod errors;
mod groups;
mod process;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub(crate) use self::errors::ExecutionError;
pub(crate) use self::groups::ChildGroups;
pub(crate) use self::process::ProcessExecutor;

use crate::validate::CommandCall;

const EXEC_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::exec");

/// Everything required to run one registered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    /// Registered command name, used for logs and errors.
    pub(crate) command: String,
    /// Absolute path of the program.
    pub(crate) program: PathBuf,
    /// Arguments following the program, in template then declaration order.
    pub(crate) arguments: Vec<String>,
    /// Complete environment; nothing is inherited from the daemon.
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) cwd: PathBuf,
    pub(crate) timeout: Duration,
    /// Combined stdout and stderr capture budget in bytes.
    pub(crate) output_limit: usize,
}

impl Invocation {
    /// Builds the invocation for a validated command call.
    pub(crate) fn new(call: &CommandCall<'_>, output_limit: usize) -> Self {
        let spec = call.spec;
        Self {
            command: spec.name().to_owned(),
            program: spec.program().to_path_buf(),
            arguments: argv::build_arguments(call),
            env: spec.env().clone(),
            cwd: spec.cwd().to_path_buf(),
            timeout: spec.timeout(),
            output_limit,
        }
    }

    /// Program followed by its arguments, as the process will see them.
    #[cfg(test)]
    pub(crate) fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.display().to_string())
            .chain(self.arguments.iter().cloned())
            .collect()
    }
}

/// Captured result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ExecutionOutput {
    /// Exit code, or the negated signal number when killed by a signal.
    pub(crate) returncode: i32,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
    /// Whether either stream exceeded the shared output budget.
    pub(crate) truncated: bool,
}

impl ExecutionOutput {
    /// Whether the process reported success.
    pub(crate) const fn succeeded(&self) -> bool {
        self.returncode == 0
    }
}

/// Runs invocations on behalf of the dispatcher.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait CommandExecutor: Send + Sync {
    /// Runs the invocation to completion or until its deadline.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] if the process cannot be spawned, cannot
    /// be waited on, or outlives its timeout.
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionOutput, ExecutionError>;
}

impl<T> CommandExecutor for Arc<T>
where
    T: CommandExecutor + ?Sized,
{
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionOutput, ExecutionError> {
        (**self).execute(invocation)
    }
}
