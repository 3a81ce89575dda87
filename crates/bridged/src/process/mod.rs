//! Process lifecycle: launch, serve until signalled, drain and stop.

use std::time::Duration;

mod errors;
pub(crate) mod launch;
pub(crate) mod shutdown;

pub use errors::LaunchError;
pub use launch::run_daemon;
pub use shutdown::ShutdownError;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
/// Upper bound on waiting for in-flight requests after a shutdown signal.
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
/// Time allowed for workers to answer once their commands have been killed.
pub(crate) const KILL_GRACE: Duration = Duration::from_secs(2);
