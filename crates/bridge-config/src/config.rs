//! Validated, immutable daemon configuration.

use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::defaults::{
    DEFAULT_AUTH_BLOCK_SECS, DEFAULT_AUTH_MAX_ATTEMPTS, DEFAULT_AUTH_WINDOW_SECS,
    DEFAULT_LOG_FILTER, MAX_DURATION_SECS,
};
use crate::error::ConfigError;
use crate::logging::{LoggingSettings, filter_from_level};
use crate::registry::document::{AuthDocument, RegistryDocument};
use crate::registry::{CommandRegistry, build_registry};
use crate::settings::Settings;
use crate::socket::SocketSettings;
use crate::token::TokenHash;

/// Failed-authentication lockout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    window: Duration,
    block_duration: Duration,
}

impl LockoutPolicy {
    /// Builds a lockout policy.
    #[must_use]
    pub const fn new(max_attempts: u32, window: Duration, block_duration: Duration) -> Self {
        Self {
            max_attempts,
            window,
            block_duration,
        }
    }

    /// Failures tolerated inside [`Self::window`]; one more blocks the client.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sliding window over which failures are counted.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// How long a blocked client is refused.
    #[must_use]
    pub const fn block_duration(&self) -> Duration {
        self.block_duration
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_AUTH_MAX_ATTEMPTS,
            Duration::from_secs(DEFAULT_AUTH_WINDOW_SECS),
            Duration::from_secs(DEFAULT_AUTH_BLOCK_SECS),
        )
    }
}

/// Authentication policy.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    enabled: bool,
    token_hash: Option<TokenHash>,
    lockout: LockoutPolicy,
}

impl AuthPolicy {
    /// Policy that admits every client without a token.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Policy requiring `token_hash` from every client.
    #[must_use]
    pub const fn required(token_hash: TokenHash, lockout: LockoutPolicy) -> Self {
        Self {
            enabled: true,
            token_hash: Some(token_hash),
            lockout,
        }
    }

    /// Whether clients must authenticate.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Expected token digest.
    #[must_use]
    pub const fn token_hash(&self) -> Option<&TokenHash> {
        self.token_hash.as_ref()
    }

    /// Lockout thresholds.
    #[must_use]
    pub const fn lockout(&self) -> LockoutPolicy {
        self.lockout
    }
}

/// Per-client request rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimit {
    enabled: bool,
    requests: u32,
    window: Duration,
}

impl RequestLimit {
    /// Limit of `requests` per `window`.
    #[must_use]
    pub const fn new(requests: u32, window: Duration) -> Self {
        Self {
            enabled: true,
            requests,
            window,
        }
    }

    /// A limit that never denies.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            enabled: false,
            requests: 0,
            window: Duration::ZERO,
        }
    }

    /// Whether the limit is enforced.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Requests admitted per window.
    #[must_use]
    pub const fn requests(&self) -> u32 {
        self.requests
    }

    /// Length of the sliding window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

/// Size and concurrency limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted request frame, in bytes.
    pub max_request_size: usize,
    /// Combined stdout and stderr capture budget, in bytes.
    pub max_output_size: usize,
    /// Connections served concurrently.
    pub max_connections: usize,
}

/// Fully validated daemon configuration.
///
/// Built once at startup and shared read-only between connection workers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    name: String,
    description: String,
    version: Option<String>,
    socket: SocketSettings,
    logging: LoggingSettings,
    auth: AuthPolicy,
    request_limit: RequestLimit,
    limits: Limits,
    allowed_executable_dirs: Vec<Utf8PathBuf>,
    debug: bool,
    commands: CommandRegistry,
}

impl ServerConfig {
    /// Reads and validates the registry named by `settings`.
    pub fn load(settings: &Settings) -> Result<Self, ConfigError> {
        let path = settings
            .config_path
            .as_deref()
            .ok_or(ConfigError::MissingConfigPath)?;
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, &format!("'{}'", path.display()), settings)
    }

    /// Validates a registry document held in memory.
    ///
    /// `origin` names the document in parse errors.
    pub fn from_json_str(text: &str, origin: &str, settings: &Settings) -> Result<Self, ConfigError> {
        let document: RegistryDocument =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                origin: origin.to_owned(),
                source,
            })?;
        Self::from_document(document, settings)
    }

    fn from_document(document: RegistryDocument, settings: &Settings) -> Result<Self, ConfigError> {
        if document.name.trim().is_empty() {
            return Err(ConfigError::EmptyField { field: "name" });
        }
        if document.socket_path.as_str().trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "socket_path",
            });
        }
        if let Some(dir) = document
            .allowed_executable_dirs
            .iter()
            .find(|dir| !dir.is_absolute())
        {
            return Err(ConfigError::RelativeAllowedDirectory { path: dir.clone() });
        }

        let limits = Limits {
            max_request_size: non_zero(document.max_request_size, "max_request_size")?,
            max_output_size: non_zero(document.max_output_size, "max_output_size")?,
            max_connections: non_zero(document.max_connections, "max_connections")?,
        };
        let request_limit = if document.enable_rate_limit {
            RequestLimit::new(
                non_zero(document.rate_limit.requests, "rate_limit.requests")?,
                seconds(document.rate_limit.window, "rate_limit.window")?,
            )
        } else {
            RequestLimit::unlimited()
        };
        let auth = resolve_auth(&document.auth, settings)?;
        let logging = resolve_logging(document.log_level.as_deref(), settings);
        let commands = build_registry(document.commands, &document.allowed_executable_dirs)?;

        Ok(Self {
            name: document.name,
            description: document.description,
            version: document.version,
            socket: SocketSettings::new(document.socket_path, document.socket_permissions),
            logging,
            auth,
            request_limit,
            limits,
            allowed_executable_dirs: document.allowed_executable_dirs,
            debug: document.debug,
            commands,
        })
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Version advertised through introspection, when configured.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Socket location and mode.
    #[must_use]
    pub const fn socket(&self) -> &SocketSettings {
        &self.socket
    }

    /// Resolved logging preferences.
    #[must_use]
    pub const fn logging(&self) -> &LoggingSettings {
        &self.logging
    }

    /// Authentication policy.
    #[must_use]
    pub const fn auth(&self) -> &AuthPolicy {
        &self.auth
    }

    /// Per-client request rate limit.
    #[must_use]
    pub const fn request_limit(&self) -> RequestLimit {
        self.request_limit
    }

    /// Size and concurrency limits.
    #[must_use]
    pub const fn limits(&self) -> Limits {
        self.limits
    }

    /// Directories executables must resolve into.
    #[must_use]
    pub fn allowed_executable_dirs(&self) -> &[Utf8PathBuf] {
        &self.allowed_executable_dirs
    }

    /// Whether failure responses may carry internal details.
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Registered commands.
    #[must_use]
    pub const fn commands(&self) -> &CommandRegistry {
        &self.commands
    }
}

fn resolve_auth(document: &AuthDocument, settings: &Settings) -> Result<AuthPolicy, ConfigError> {
    let enabled = settings
        .auth_enabled
        .or(document.enabled)
        .unwrap_or(false);
    let token_hash = settings
        .auth_token_hash
        .as_deref()
        .or(document.token_hash.as_deref())
        .filter(|text| !text.trim().is_empty())
        .map(TokenHash::parse)
        .transpose()?;

    let max_attempts = non_zero(
        settings
            .auth_max_attempts
            .or(document.max_attempts)
            .unwrap_or(DEFAULT_AUTH_MAX_ATTEMPTS),
        "auth.max_attempts",
    )?;
    let window = seconds(
        settings
            .auth_window_seconds
            .or(document.window_seconds)
            .unwrap_or(DEFAULT_AUTH_WINDOW_SECS),
        "auth.window_seconds",
    )?;
    let block_duration = seconds(
        settings
            .auth_block_duration
            .or(document.block_duration_seconds)
            .unwrap_or(DEFAULT_AUTH_BLOCK_SECS),
        "auth.block_duration_seconds",
    )?;
    let lockout = LockoutPolicy::new(max_attempts, window, block_duration);

    if !enabled {
        return Ok(AuthPolicy {
            enabled,
            token_hash,
            lockout,
        });
    }
    let hash = token_hash.ok_or(ConfigError::MissingTokenHash)?;
    Ok(AuthPolicy::required(hash, lockout))
}

fn resolve_logging(log_level: Option<&str>, settings: &Settings) -> LoggingSettings {
    let filter = settings.log_filter.clone().unwrap_or_else(|| {
        log_level
            .filter(|level| !level.trim().is_empty())
            .map_or_else(|| String::from(DEFAULT_LOG_FILTER), filter_from_level)
    });
    LoggingSettings::new(filter, settings.log_format.unwrap_or_default())
}

fn non_zero<T>(value: T, field: &'static str) -> Result<T, ConfigError>
where
    T: Default + PartialEq,
{
    if value == T::default() {
        return Err(ConfigError::ZeroLimit { field });
    }
    Ok(value)
}

fn seconds(value: u64, field: &'static str) -> Result<Duration, ConfigError> {
    let checked = non_zero(value, field)?;
    if checked > MAX_DURATION_SECS {
        return Err(ConfigError::DurationTooLong {
            field,
            max: MAX_DURATION_SECS,
        });
    }
    Ok(Duration::from_secs(checked))
}
