//! Configuration for the command bridge daemon.
//!
//! The daemon is driven by a JSON command registry: a document naming the
//! socket to listen on, the security policy, size limits, and the fixed set of
//! commands clients may run together with their parameter schemas. This crate
//! parses that document, layers command-line and environment [`Settings`] over
//! it, and validates the result into an immutable [`ServerConfig`].
//!
//! Validation is strict. Duplicate names, executables outside the allowed
//! directories, malformed patterns, and authentication without a token hash
//! all produce a [`ConfigError`], and the daemon refuses to start.

mod config;
mod defaults;
mod error;
mod example;
mod logging;
mod registry;
mod settings;
mod socket;
mod token;

pub use config::{AuthPolicy, Limits, LockoutPolicy, RequestLimit, ServerConfig};
pub use defaults::{
    DEFAULT_AUTH_BLOCK_SECS, DEFAULT_AUTH_MAX_ATTEMPTS, DEFAULT_AUTH_WINDOW_SECS,
    DEFAULT_COMMAND_CWD, DEFAULT_COMMAND_PATH, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_LOG_FILTER,
    DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_OUTPUT_SIZE, DEFAULT_MAX_REQUEST_SIZE,
    DEFAULT_RATE_LIMIT_REQUESTS, DEFAULT_RATE_LIMIT_WINDOW_SECS, DEFAULT_SOCKET_PERMISSIONS,
    MAX_DURATION_SECS, default_command_env,
};
pub use error::ConfigError;
pub use example::EXAMPLE_DOCUMENT;
pub use logging::{LogFormat, LogFormatParseError, LoggingSettings};
pub use registry::{
    CommandRegistry, CommandSpec, ParameterPattern, ParameterSpec, ParameterStyle, ParameterType,
};
pub use settings::Settings;
pub use socket::{
    SocketPermissions, SocketPermissionsError, SocketPreparationError, SocketSettings,
};
pub use token::{TokenHash, TokenHashError};

/// Name of the liveness probe command.
pub const PING_COMMAND: &str = "__ping__";

/// Name of the introspection command.
pub const INTROSPECT_COMMAND: &str = "__introspect__";

/// Prefix reserved for built-in commands; registry entries may not use it.
pub const RESERVED_COMMAND_PREFIX: &str = "__";
