use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::token::TokenHashError;

/// Errors raised while loading or validating the command registry.
///
/// Every variant is fatal: the daemon refuses to bind its socket when any of
/// them is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No registry path was supplied on the command line.
    #[error("no configuration file was supplied")]
    MissingConfigPath,
    /// The registry file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The registry document is not valid JSON or has the wrong shape.
    #[error("failed to parse configuration from {origin}: {source}")]
    Parse {
        /// Human-readable origin of the document.
        origin: String,
        /// Parser failure.
        #[source]
        source: serde_json::Error,
    },
    /// A required string field is blank.
    #[error("configuration field '{field}' must not be empty")]
    EmptyField {
        /// Offending field.
        field: &'static str,
    },
    /// Two commands share a name.
    #[error("command '{name}' is defined more than once")]
    DuplicateCommand {
        /// Repeated command name.
        name: String,
    },
    /// Two parameters of a command share a name.
    #[error("parameter '{parameter}' is defined more than once on command '{command}'")]
    DuplicateParameter {
        /// Owning command.
        command: String,
        /// Repeated parameter name.
        parameter: String,
    },
    /// A command name is blank.
    #[error("command names must not be empty")]
    EmptyCommandName,
    /// A command name collides with the reserved prefix.
    #[error("command '{name}' uses the reserved '__' prefix")]
    ReservedCommandName {
        /// Rejected command name.
        name: String,
    },
    /// A parameter name is blank.
    #[error("command '{command}' declares a parameter with an empty name")]
    EmptyParameterName {
        /// Owning command.
        command: String,
    },
    /// A command has no executable template.
    #[error("command '{command}' has an empty executable")]
    EmptyExecutable {
        /// Offending command.
        command: String,
    },
    /// An allowed executable directory is relative.
    #[error("allowed executable directory '{path}' must be absolute")]
    RelativeAllowedDirectory {
        /// Rejected directory.
        path: Utf8PathBuf,
    },
    /// The executable does not resolve to an executable file inside an allowed directory.
    #[error("executable '{executable}' for command '{command}' is not inside an allowed directory")]
    ExecutableNotAllowed {
        /// Offending command.
        command: String,
        /// Executable as configured.
        executable: String,
    },
    /// The working directory of a command is relative.
    #[error("working directory '{cwd}' for command '{command}' must be absolute")]
    RelativeWorkingDirectory {
        /// Offending command.
        command: String,
        /// Configured directory.
        cwd: Utf8PathBuf,
    },
    /// A parameter pattern is not a valid regular expression.
    #[error("pattern for parameter '{parameter}' on command '{command}' is invalid: {source}")]
    InvalidPattern {
        /// Owning command.
        command: String,
        /// Offending parameter.
        parameter: String,
        /// Regex compilation failure.
        #[source]
        source: Box<regex::Error>,
    },
    /// A pattern was declared on a non-string parameter.
    #[error("parameter '{parameter}' on command '{command}' declares a pattern but is not a string")]
    PatternRequiresString {
        /// Owning command.
        command: String,
        /// Offending parameter.
        parameter: String,
    },
    /// An enum member does not match the declared parameter type.
    #[error("enum values for parameter '{parameter}' on command '{command}' do not match its type")]
    EnumTypeMismatch {
        /// Owning command.
        command: String,
        /// Offending parameter.
        parameter: String,
    },
    /// An enum was declared without members.
    #[error("enum for parameter '{parameter}' on command '{command}' is empty")]
    EmptyEnum {
        /// Owning command.
        command: String,
        /// Offending parameter.
        parameter: String,
    },
    /// A numeric limit is zero.
    #[error("'{field}' must be greater than zero")]
    ZeroLimit {
        /// Offending field.
        field: &'static str,
    },
    /// A duration exceeds the accepted maximum.
    #[error("'{field}' must not exceed {max} seconds")]
    DurationTooLong {
        /// Offending field.
        field: &'static str,
        /// Largest accepted value.
        max: u64,
    },
    /// A command timeout is zero or too long.
    #[error("timeout for command '{command}' must be between 1 and {max} seconds")]
    InvalidTimeout {
        /// Offending command.
        command: String,
        /// Largest accepted value.
        max: u64,
    },
    /// Authentication is enabled but no token hash is available.
    #[error("authentication is enabled but no token hash was configured")]
    MissingTokenHash,
    /// The configured token hash is malformed.
    #[error("invalid token hash: {0}")]
    InvalidTokenHash(#[from] TokenHashError),
}
