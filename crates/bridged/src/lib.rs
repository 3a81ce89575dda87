//! Command bridge daemon.
//!
//! `bridged` exposes an administrator-defined set of host commands over a
//! local Unix domain socket. Each connection carries one JSON request naming
//! a registered command and its parameters, and receives one JSON response.
//!
//! A request passes through four stages, each able to answer early:
//!
//! 1. the frame is size-checked and decoded;
//! 2. the guard applies per-client rate limits and token authentication;
//! 3. the command is resolved against the registry and every declared
//!    parameter is coerced and checked;
//! 4. the executor runs the program directly, without a shell, under a pinned
//!    environment, a deadline and a bounded output budget.
//!
//! Configuration is loaded and validated once by [`bridge_config`] before the
//! socket is bound; a registry that fails validation prevents startup.

mod bootstrap;
mod cli;
mod dispatch;
mod exec;
mod guard;
mod health;
mod process;
mod telemetry;
mod transport;
mod validate;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use cli::run;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, ShutdownError, run_daemon};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
