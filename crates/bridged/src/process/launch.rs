//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;
use std::time::Duration;

use bridge_config::Settings;
use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatch::DispatchConnectionHandler;
use crate::exec::{ChildGroups, ProcessExecutor};
use crate::guard::RateLimitGuard;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{KILL_GRACE, PROCESS_TARGET, SHUTDOWN_TIMEOUT};

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
    /// How long in-flight requests may run after shutdown before their
    /// commands are killed.
    pub(crate) drain_timeout: Duration,
}

/// Runs the daemon in the foreground until a termination signal arrives.
///
/// # Errors
///
/// Returns a [`LaunchError`] when bootstrap fails, the socket cannot be bound
/// or signal handlers cannot be installed.
pub fn run_daemon(settings: Settings) -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader::new(settings),
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal,
        drain_timeout: SHUTDOWN_TIMEOUT,
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        drain_timeout,
    } = plan;

    let daemon = bootstrap_with(&loader, &*reporter)?;
    let config = daemon.shared_config();
    let listener = SocketListener::bind(config.socket())?;

    let guard = RateLimitGuard::new(config.auth().clone(), config.request_limit());
    let groups = ChildGroups::default();
    let handler = Arc::new(DispatchConnectionHandler::new(
        Arc::clone(&config),
        guard,
        ProcessExecutor::new(groups.clone()),
    ));
    let listener_handle = listener.start(handler, config.limits().max_connections)?;
    reporter.listener_ready(config.socket());
    info!(
        target: PROCESS_TARGET,
        name = config.name(),
        socket = %config.socket(),
        commands = config.commands().len(),
        "daemon running"
    );

    shutdown.wait()?;
    listener_handle.shutdown();
    if !listener_handle.wait_for_idle(drain_timeout) {
        let killed = groups.kill_all();
        warn!(
            target: PROCESS_TARGET,
            timeout_ms = u64::try_from(drain_timeout.as_millis()).unwrap_or(u64::MAX),
            killed,
            "in-flight requests still running at shutdown; killed their commands"
        );
        if !listener_handle.wait_for_idle(KILL_GRACE) {
            warn!(
                target: PROCESS_TARGET,
                "workers still busy after killing running commands"
            );
        }
    }
    listener_handle.join()?;
    reporter.shutdown_completed();
    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
