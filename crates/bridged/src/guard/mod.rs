//! Authentication and rate-limit guard.
//!
//! Every request passes through an [`AccessGuard`] before its command is
//! resolved. The guard owns the only state shared between connections: per
//! client sliding windows of request and failed-authentication timestamps and
//! an optional lockout deadline. Clients are identified by a [`ClientKey`]
//! derived from the connection's peer credentials.

mod clock;
mod ledger;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub(crate) use self::clock::{Clock, SystemClock};
#[cfg(test)]
pub(crate) use self::clock::ManualClock;
pub(crate) use self::ledger::RateLimitGuard;

pub(crate) const GUARD_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::guard");

/// Identity used to key rate-limit and lockout state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ClientKey {
    /// Peer process credentials reported by the kernel.
    User(u32),
    /// Shared bucket for peers whose credentials could not be read.
    Unidentified,
}

impl fmt::Display for ClientKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(uid) => write!(formatter, "uid:{uid}"),
            Self::Unidentified => formatter.write_str("unidentified"),
        }
    }
}

/// Reason a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Denial {
    /// The token hash was missing or wrong.
    Unauthorized,
    /// The client exceeded its request budget for the current window.
    RateLimited {
        /// Time until the oldest request leaves the window.
        retry_after: Duration,
    },
    /// The client is locked out after repeated authentication failures.
    Blocked {
        /// Time until the lockout expires.
        retry_after: Duration,
    },
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardDecision {
    /// The request may proceed.
    Allow,
    /// The request must be answered with a denial.
    Deny(Denial),
}

/// Admission check run before any command is resolved.
pub(crate) trait AccessGuard: Send + Sync {
    /// Records the request for `client` and decides whether it may proceed.
    fn check(&self, client: &ClientKey, presented_hash: Option<&str>) -> GuardDecision;
}

impl<T> AccessGuard for Arc<T>
where
    T: AccessGuard + ?Sized,
{
    fn check(&self, client: &ClientKey, presented_hash: Option<&str>) -> GuardDecision {
        (**self).check(client, presented_hash)
    }
}

/// Rounds a wait up to whole seconds, never reporting zero.
pub(crate) fn retry_after_secs(wait: Duration) -> u64 {
    let whole = wait.as_secs();
    let rounded = if wait.subsec_nanos() > 0 {
        whole.saturating_add(1)
    } else {
        whole
    };
    rounded.max(1)
}
