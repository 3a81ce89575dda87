//! In-memory rate-limit and lockout ledger.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use bridge_config::{AuthPolicy, RequestLimit};
use tracing::{debug, warn};

use super::{AccessGuard, ClientKey, Clock, Denial, GUARD_TARGET, GuardDecision, SystemClock};

/// Guard enforcing [`RequestLimit`] and [`AuthPolicy`] per client.
///
/// Each check runs under a single lock, so the count-then-record sequence for
/// a client can never interleave with another connection's.
#[derive(Debug)]
pub(crate) struct RateLimitGuard<C = SystemClock> {
    auth: AuthPolicy,
    limit: RequestLimit,
    clock: C,
    clients: Mutex<ClientTable>,
}

#[derive(Debug, Default)]
struct ClientTable {
    records: HashMap<ClientKey, ClientRecord>,
    last_sweep: Option<Instant>,
}

#[derive(Debug, Default)]
struct ClientRecord {
    requests: VecDeque<Instant>,
    failures: VecDeque<Instant>,
    blocked_until: Option<Instant>,
}

impl RateLimitGuard<SystemClock> {
    /// Builds a guard reading the system clock.
    pub(crate) fn new(auth: AuthPolicy, limit: RequestLimit) -> Self {
        Self::with_clock(auth, limit, SystemClock)
    }
}

impl<C> RateLimitGuard<C>
where
    C: Clock,
{
    /// Builds a guard with an injected clock.
    pub(crate) fn with_clock(auth: AuthPolicy, limit: RequestLimit, clock: C) -> Self {
        Self {
            auth,
            limit,
            clock,
            clients: Mutex::new(ClientTable::default()),
        }
    }

    /// Number of clients currently tracked.
    #[cfg(test)]
    pub(crate) fn tracked_clients(&self) -> usize {
        self.lock().records.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientTable> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sweep_interval(&self) -> Duration {
        self.limit.window().max(self.auth.lockout().window())
    }

    fn authenticate(&self, presented_hash: Option<&str>) -> bool {
        match (self.auth.token_hash(), presented_hash) {
            (Some(expected), Some(presented)) => expected.matches(presented),
            _ => false,
        }
    }
}

impl<C> AccessGuard for RateLimitGuard<C>
where
    C: Clock,
{
    fn check(&self, client: &ClientKey, presented_hash: Option<&str>) -> GuardDecision {
        let now = self.clock.now();
        let lockout = self.auth.lockout();
        let mut table = self.lock();
        table.sweep(now, self.sweep_interval(), self.limit.window(), lockout.window());

        let record = table.records.entry(client.clone()).or_default();
        record.prune(now, self.limit.window(), lockout.window());

        if let Some(until) = record.blocked_until {
            debug!(target: GUARD_TARGET, %client, "rejecting blocked client");
            return GuardDecision::Deny(Denial::Blocked {
                retry_after: until.saturating_duration_since(now),
            });
        }

        if self.limit.enabled() {
            let budget = usize::try_from(self.limit.requests()).unwrap_or(usize::MAX);
            if record.requests.len() >= budget {
                let retry_after = record.requests.front().map_or(self.limit.window(), |oldest| {
                    self.limit
                        .window()
                        .saturating_sub(now.saturating_duration_since(*oldest))
                });
                debug!(target: GUARD_TARGET, %client, "request rate limit exceeded");
                return GuardDecision::Deny(Denial::RateLimited { retry_after });
            }
            record.requests.push_back(now);
        }

        if !self.auth.enabled() {
            return GuardDecision::Allow;
        }

        if self.authenticate(presented_hash) {
            record.failures.clear();
            return GuardDecision::Allow;
        }

        record.failures.push_back(now);
        let tolerated = usize::try_from(lockout.max_attempts()).unwrap_or(usize::MAX);
        if record.failures.len() > tolerated {
            record.blocked_until = Some(now + lockout.block_duration());
            warn!(
                target: GUARD_TARGET,
                %client,
                failures = record.failures.len(),
                block_secs = lockout.block_duration().as_secs(),
                "client blocked after repeated authentication failures"
            );
            return GuardDecision::Deny(Denial::Blocked {
                retry_after: lockout.block_duration(),
            });
        }

        debug!(
            target: GUARD_TARGET,
            %client,
            failures = record.failures.len(),
            "authentication failed"
        );
        GuardDecision::Deny(Denial::Unauthorized)
    }
}

impl ClientTable {
    /// Drops idle clients at most once per `interval`.
    fn sweep(
        &mut self,
        now: Instant,
        interval: Duration,
        request_window: Duration,
        failure_window: Duration,
    ) {
        let Some(last) = self.last_sweep else {
            self.last_sweep = Some(now);
            return;
        };
        if now.saturating_duration_since(last) < interval {
            return;
        }
        self.records.retain(|_, record| {
            record.prune(now, request_window, failure_window);
            !record.is_idle()
        });
        self.last_sweep = Some(now);
    }
}

impl ClientRecord {
    fn prune(&mut self, now: Instant, request_window: Duration, failure_window: Duration) {
        prune_window(&mut self.requests, now, request_window);
        prune_window(&mut self.failures, now, failure_window);
        if self.blocked_until.is_some_and(|until| until <= now) {
            self.blocked_until = None;
            self.failures.clear();
        }
    }

    fn is_idle(&self) -> bool {
        self.requests.is_empty() && self.failures.is_empty() && self.blocked_until.is_none()
    }
}

fn prune_window(entries: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while entries
        .front()
        .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= window)
    {
        entries.pop_front();
    }
}
