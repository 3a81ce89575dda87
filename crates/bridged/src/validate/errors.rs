//! Client-input failures detected while validating a request.

use bridge_config::ParameterType;
use thiserror::Error;

/// Errors describing why a request was rejected before execution.
///
/// Every variant is recovered locally and answered with a structured failure
/// response; none of them terminates the connection handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum RequestError {
    /// The frame exceeded `max_request_size`.
    #[error("Request too large (max {limit} bytes)")]
    TooLarge {
        /// Bytes received before reading stopped.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// The frame is not a JSON request object.
    #[error("Malformed request: {message}")]
    Malformed {
        /// Parser diagnostic.
        message: String,
    },
    /// The command is not registered.
    #[error("Unknown command: {command}. Available commands: {}", .available.join(", "))]
    UnknownCommand {
        /// Command name supplied by the client.
        command: String,
        /// Registered command names in declaration order.
        available: Vec<String>,
    },
    /// A required parameter was absent.
    #[error("Missing required parameter: {name}")]
    MissingParameter {
        /// Parameter name.
        name: String,
    },
    /// A parameter could not be coerced to its declared type.
    #[error("Invalid type for parameter '{name}': expected {expected}")]
    InvalidParameterType {
        /// Parameter name.
        name: String,
        /// Declared type.
        expected: ParameterType,
    },
    /// A string parameter failed its pattern.
    #[error("Parameter '{name}' does not match the required pattern")]
    PatternMismatch {
        /// Parameter name.
        name: String,
    },
    /// A parameter is not one of its enumerated values.
    #[error("Parameter '{name}' must be one of the allowed values")]
    InvalidEnumValue {
        /// Parameter name.
        name: String,
    },
    /// A parameter is longer than its declared maximum.
    #[error("Parameter '{name}' exceeds the maximum length of {max_length} characters")]
    ParameterTooLong {
        /// Parameter name.
        name: String,
        /// Declared maximum.
        max_length: usize,
    },
}

impl RequestError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub(crate) fn missing(name: &str) -> Self {
        Self::MissingParameter {
            name: name.to_owned(),
        }
    }

    pub(crate) fn invalid_type(name: &str, expected: ParameterType) -> Self {
        Self::InvalidParameterType {
            name: name.to_owned(),
            expected,
        }
    }

    pub(crate) fn pattern_mismatch(name: &str) -> Self {
        Self::PatternMismatch {
            name: name.to_owned(),
        }
    }

    pub(crate) fn invalid_enum(name: &str) -> Self {
        Self::InvalidEnumValue {
            name: name.to_owned(),
        }
    }

    pub(crate) fn too_long(name: &str, max_length: usize) -> Self {
        Self::ParameterTooLong {
            name: name.to_owned(),
            max_length,
        }
    }
}
