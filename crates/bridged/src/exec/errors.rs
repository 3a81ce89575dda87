//! Errors raised while running a command.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Failures that prevent a command from producing a result.
///
/// A non-zero exit status is not an error here; it is reported through
/// [`super::ExecutionOutput::returncode`].
#[derive(Debug, Clone, Error)]
pub(crate) enum ExecutionError {
    /// The process could not be started.
    #[error("command '{command}' failed to start: {source}")]
    Spawn {
        command: String,
        #[source]
        source: Arc<io::Error>,
    },
    /// Waiting on the process failed.
    #[error("failed to wait for command '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: Arc<io::Error>,
    },
    /// The process outlived its deadline and was killed.
    #[error("Command timeout after {timeout_secs} seconds")]
    Timeout { command: String, timeout_secs: u64 },
}

impl ExecutionError {
    pub(crate) fn spawn(command: &str, source: io::Error) -> Self {
        Self::Spawn {
            command: command.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn wait(command: &str, source: io::Error) -> Self {
        Self::Wait {
            command: command.to_owned(),
            source: Arc::new(source),
        }
    }
}
