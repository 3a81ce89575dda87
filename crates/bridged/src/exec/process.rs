//! Process-backed executor.

use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
use nix::errno::Errno;
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid};
use tracing::{debug, warn};

use super::capture::{OutputBudget, spawn_reader};
use super::groups::{ChildGroups, TrackedGroup};
use super::{CommandExecutor, EXEC_TARGET, ExecutionError, ExecutionOutput, Invocation};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// Minimum time allowed for output readers to drain after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Spawns registered commands directly, without a shell.
///
/// Each child leads a fresh process group with a cleared environment, a null
/// stdin and piped output. When the child exits or times out, any processes
/// left in its group are killed so nothing outlives the request. Output is
/// collected until the invocation deadline at the latest, even when a process
/// that escaped the group keeps the pipes open.
#[derive(Debug, Default, Clone)]
pub(crate) struct ProcessExecutor {
    groups: ChildGroups,
}

impl ProcessExecutor {
    /// Builds an executor that registers its children in `groups`.
    pub(crate) const fn new(groups: ChildGroups) -> Self {
        Self { groups }
    }

    #[cfg(test)]
    pub(crate) const fn groups(&self) -> &ChildGroups {
        &self.groups
    }
}

impl CommandExecutor for ProcessExecutor {
    fn execute(&self, invocation: &Invocation) -> Result<ExecutionOutput, ExecutionError> {
        let started = Instant::now();
        let mut child = spawn(invocation)?;
        let group = self.groups.track(&child);
        debug!(
            target: EXEC_TARGET,
            command = %invocation.command,
            pid = child.id(),
            program = %invocation.program.display(),
            arguments = invocation.arguments.len(),
            "spawned command"
        );

        let budget = OutputBudget::new(invocation.output_limit);
        let stdout = spawn_reader(child.stdout.take(), budget.clone());
        let stderr = spawn_reader(child.stderr.take(), budget);

        let outcome = wait_with_deadline(&mut child, group, invocation.timeout);
        let collect_by = (started + invocation.timeout).max(Instant::now() + DRAIN_GRACE);
        let stdout = stdout.finish(collect_by);
        let stderr = stderr.finish(collect_by);
        if stdout.abandoned || stderr.abandoned {
            warn!(
                target: EXEC_TARGET,
                command = %invocation.command,
                "output pipes held open after exit; returning partial output"
            );
        }
        let (stdout, stdout_truncated) = stdout.into_text();
        let (stderr, stderr_truncated) = stderr.into_text();

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(Some(status)) => {
                let output = ExecutionOutput {
                    returncode: returncode(status),
                    stdout,
                    stderr,
                    truncated: stdout_truncated || stderr_truncated,
                };
                debug!(
                    target: EXEC_TARGET,
                    command = %invocation.command,
                    returncode = output.returncode,
                    truncated = output.truncated,
                    elapsed_ms,
                    "command exited"
                );
                Ok(output)
            }
            Ok(None) => {
                warn!(
                    target: EXEC_TARGET,
                    command = %invocation.command,
                    timeout_secs = invocation.timeout.as_secs(),
                    elapsed_ms,
                    "command timed out and was killed"
                );
                Err(ExecutionError::Timeout {
                    command: invocation.command.clone(),
                    timeout_secs: invocation.timeout.as_secs(),
                })
            }
            Err(error) => Err(ExecutionError::wait(&invocation.command, error)),
        }
    }
}

fn spawn(invocation: &Invocation) -> Result<Child, ExecutionError> {
    Command::new(&invocation.program)
        .args(&invocation.arguments)
        .env_clear()
        .envs(&invocation.env)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()
        .map_err(|error| ExecutionError::spawn(&invocation.command, error))
}

/// Polls the child until it exits or the deadline passes.
///
/// Whatever remains of the child's group is killed while the exited leader
/// still holds the pgid, then the leader is reaped. Returns `Ok(None)` after
/// killing and reaping a child that overran.
fn wait_with_deadline(
    child: &mut Child,
    group: TrackedGroup,
    timeout: Duration,
) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        match poll_exit(child)? {
            ExitPoll::Running => {}
            ExitPoll::Exited => {
                group.kill();
                drop(group);
                return child.wait().map(Some);
            }
            #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
            ExitPoll::Reaped(status) => return Ok(Some(status)),
        }
        if Instant::now() >= deadline {
            group.kill();
            drop(group);
            if let Err(error) = child.kill()
                && error.kind() != io::ErrorKind::InvalidInput
            {
                return Err(error);
            }
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

enum ExitPoll {
    Running,
    /// Exited but not yet reaped.
    Exited,
    /// Exited and already reaped; the group can no longer be signalled safely.
    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    Reaped(ExitStatus),
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
fn poll_exit(child: &Child) -> io::Result<ExitPoll> {
    let pid = super::groups::process_id(child)
        .ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
    let flags = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    match waitid(Id::Pid(pid), flags) {
        Ok(WaitStatus::StillAlive) | Err(Errno::EINTR) => Ok(ExitPoll::Running),
        Ok(_) => Ok(ExitPoll::Exited),
        Err(error) => Err(error.into()),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
fn poll_exit(child: &mut Child) -> io::Result<ExitPoll> {
    Ok(child.try_wait()?.map_or(ExitPoll::Running, ExitPoll::Reaped))
}

fn returncode(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}
