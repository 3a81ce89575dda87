//! Registry of process groups led by running commands.

use std::collections::HashSet;
use std::process::Child;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use tracing::warn;

use super::EXEC_TARGET;

/// Process groups of commands that have not been reaped yet.
///
/// A group stays registered only while its leader is unreaped, so the pgid
/// cannot have been recycled when [`ChildGroups::kill_all`] signals it.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChildGroups {
    live: Arc<Mutex<HashSet<Pid>>>,
}

impl ChildGroups {
    /// Registers the group led by `child` until the returned guard drops.
    pub(super) fn track(&self, child: &Child) -> TrackedGroup {
        let pgid = process_id(child);
        if let Some(pgid) = pgid {
            self.lock().insert(pgid);
        }
        TrackedGroup {
            pgid,
            groups: self.clone(),
        }
    }

    /// Kills every registered group and returns how many were signalled.
    pub(crate) fn kill_all(&self) -> usize {
        let live = self.lock();
        for pgid in live.iter() {
            kill_group(*pgid);
        }
        live.len()
    }

    /// Number of groups currently registered.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Pid>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of one command's group; dropping it unregisters the group.
///
/// Drop the guard before reaping the leader.
#[derive(Debug)]
pub(super) struct TrackedGroup {
    pgid: Option<Pid>,
    groups: ChildGroups,
}

impl TrackedGroup {
    /// Sends `SIGKILL` to every process remaining in the group.
    pub(super) fn kill(&self) {
        if let Some(pgid) = self.pgid {
            kill_group(pgid);
        }
    }
}

impl Drop for TrackedGroup {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid {
            self.groups.lock().remove(&pgid);
        }
    }
}

pub(super) fn process_id(child: &Child) -> Option<Pid> {
    i32::try_from(child.id()).ok().map(Pid::from_raw)
}

fn kill_group(pgid: Pid) {
    match killpg(pgid, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(error) => warn!(
            target: EXEC_TARGET,
            pgid = pgid.as_raw(),
            error = %error,
            "failed to kill command process group"
        ),
    }
}
