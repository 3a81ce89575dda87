use std::collections::BTreeMap;

use camino::Utf8PathBuf;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default Unix permission bits applied to the listening socket.
pub const DEFAULT_SOCKET_PERMISSIONS: u32 = 0o666;

/// Default number of requests a client may issue per rate window.
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 30;

/// Default length of the request rate window in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default number of failed authentications tolerated per window.
pub const DEFAULT_AUTH_MAX_ATTEMPTS: u32 = 5;

/// Default length of the failed authentication window in seconds.
pub const DEFAULT_AUTH_WINDOW_SECS: u64 = 300;

/// Default lockout applied once the failure budget is exhausted.
pub const DEFAULT_AUTH_BLOCK_SECS: u64 = 900;

/// Default upper bound on a single request frame, in bytes.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1_048_576;

/// Default combined stdout and stderr capture budget, in bytes.
pub const DEFAULT_MAX_OUTPUT_SIZE: usize = 100_000;

/// Default number of concurrently served connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;

/// Default command timeout in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

/// Default working directory for spawned commands.
pub const DEFAULT_COMMAND_CWD: &str = "/";

/// `PATH` handed to commands that do not declare their own environment.
pub const DEFAULT_COMMAND_PATH: &str = "/usr/bin:/bin";

/// Upper bound accepted for any configured duration, in seconds.
pub const MAX_DURATION_SECS: u64 = 31_536_000;

pub(crate) const fn default_true() -> bool {
    true
}

pub(crate) const fn default_rate_limit_requests() -> u32 {
    DEFAULT_RATE_LIMIT_REQUESTS
}

pub(crate) const fn default_rate_limit_window() -> u64 {
    DEFAULT_RATE_LIMIT_WINDOW_SECS
}

pub(crate) const fn default_max_request_size() -> usize {
    DEFAULT_MAX_REQUEST_SIZE
}

pub(crate) const fn default_max_output_size() -> usize {
    DEFAULT_MAX_OUTPUT_SIZE
}

pub(crate) const fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

pub(crate) const fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

pub(crate) fn default_command_cwd() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_COMMAND_CWD)
}

/// Environment handed to commands that do not declare one.
#[must_use]
pub fn default_command_env() -> BTreeMap<String, String> {
    BTreeMap::from([(String::from("PATH"), String::from(DEFAULT_COMMAND_PATH))])
}
