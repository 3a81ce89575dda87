//! Command-line and environment settings layered over the registry file.
//!
//! Each flag falls back to an environment variable; values supplied either
//! way take precedence over the matching key in the registry document.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use crate::logging::LogFormat;

/// Runtime settings for the `bridged` binary.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "bridged",
    version,
    about = "Expose an allowlisted set of host commands over a Unix domain socket"
)]
pub struct Settings {
    /// Path to the JSON command registry.
    #[arg(value_name = "CONFIG", required_unless_present = "example")]
    pub config_path: Option<PathBuf>,
    /// Validate the registry, print a summary, and exit.
    #[arg(long)]
    pub validate: bool,
    /// Print an example registry document and exit.
    #[arg(long, conflicts_with = "validate")]
    pub example: bool,
    /// Require clients to present the token hash.
    #[arg(
        long,
        env = "AUTH_ENABLED",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        value_name = "BOOL"
    )]
    pub auth_enabled: Option<bool>,
    /// SHA-256 hex digest of the shared secret.
    #[arg(long, env = "AUTH_TOKEN_HASH", hide_env_values = true, value_name = "HEX")]
    pub auth_token_hash: Option<String>,
    /// Failed authentications tolerated per window before blocking.
    #[arg(long, env = "AUTH_MAX_ATTEMPTS", value_name = "COUNT")]
    pub auth_max_attempts: Option<u32>,
    /// Length of the failed authentication window in seconds.
    #[arg(long, env = "AUTH_WINDOW_SECONDS", value_name = "SECONDS")]
    pub auth_window_seconds: Option<u64>,
    /// Lockout applied after too many failures, in seconds.
    #[arg(long, env = "AUTH_BLOCK_DURATION", value_name = "SECONDS")]
    pub auth_block_duration: Option<u64>,
    /// `tracing` filter directive, overriding the registry `log_level`.
    #[arg(long, env = "BRIDGE_LOG_FILTER", value_name = "FILTER")]
    pub log_filter: Option<String>,
    /// Log output format.
    #[arg(long, env = "BRIDGE_LOG_FORMAT", value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl Settings {
    /// Builds settings that only point at a registry file.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
            ..Self::default()
        }
    }
}
