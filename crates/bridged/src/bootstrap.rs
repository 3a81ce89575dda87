//! Daemon bootstrap orchestration.
//!
//! Bootstrap loads and validates the registry, installs telemetry and
//! prepares the socket directory. Every failure here is fatal and happens
//! before the socket is bound.

use std::sync::Arc;

use bridge_config::{ConfigError, ServerConfig, Settings, SocketPreparationError};
use thiserror::Error;

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads and validates the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation failure shared behind an [`Arc`].
    fn load(&self) -> Result<ServerConfig, Arc<ConfigError>>;
}

/// Loader that reads the registry named by the runtime settings.
#[derive(Debug, Clone)]
pub struct SystemConfigLoader {
    settings: Settings,
}

impl SystemConfigLoader {
    /// Builds a loader for the given settings.
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<ServerConfig, Arc<ConfigError>> {
        ServerConfig::load(&self.settings).map_err(Arc::new)
    }
}

/// Loader that returns a pre-validated configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: ServerConfig,
}

impl StaticConfigLoader {
    /// Wraps an already validated configuration.
    #[must_use]
    pub const fn new(config: ServerConfig) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<ServerConfig, Arc<ConfigError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<ConfigError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Result of a successful bootstrap invocation.
#[derive(Debug)]
pub struct Daemon {
    config: Arc<ServerConfig>,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the validated configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shared handle to the configuration for connection workers.
    #[must_use]
    pub fn shared_config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.config)
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns a [`BootstrapError`] when the configuration is invalid, telemetry
/// cannot be installed, or the socket directory cannot be created. The
/// reporter observes the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(config.logging()) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.socket().prepare_filesystem() {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    reporter.bootstrap_succeeded(&config);
    Ok(Daemon {
        config: Arc::new(config),
        telemetry,
    })
}
