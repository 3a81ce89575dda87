//! Test configuration loaders for scenarios covering success and failure paths.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_config::{ConfigError, ServerConfig, Settings};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

use super::{SAMPLE_COMMANDS, server_config_at};

/// Loader that provisions the socket under a nested temporary directory.
///
/// Clones share the directory so a scenario can inspect the socket path after
/// the daemon thread has dropped its copy.
#[derive(Clone)]
pub(crate) struct TestConfigLoader {
    dir: Arc<TempDir>,
    extra: String,
    commands: String,
}

impl TestConfigLoader {
    pub(crate) fn new() -> Self {
        Self::with_settings("")
    }

    /// Loader whose registry carries additional top-level keys.
    pub(crate) fn with_settings(extra: &str) -> Self {
        Self {
            dir: Arc::new(
                TempDir::new().expect("failed to create temporary directory for socket"),
            ),
            extra: extra.to_owned(),
            commands: SAMPLE_COMMANDS.to_owned(),
        }
    }

    /// Replaces the sample registry with `commands`.
    pub(crate) fn with_commands(mut self, commands: &str) -> Self {
        commands.clone_into(&mut self.commands);
        self
    }

    /// Scratch directory shared by every clone of this loader.
    pub(crate) fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn socket_path(&self) -> PathBuf {
        self.dir.path().join("run").join("bridge.sock")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<ServerConfig, Arc<ConfigError>> {
        Ok(server_config_at(
            &self.socket_path(),
            &self.extra,
            &self.commands,
        ))
    }
}

/// Loader whose registry names an executable outside the allowed directories.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<ServerConfig, Arc<ConfigError>> {
        let document = r#"{
            "name": "Broken",
            "socket_path": "/tmp/bridge-broken.sock",
            "allowed_executable_dirs": ["/usr/bin"],
            "commands": {"shell": {"executable": ["/opt/elsewhere/sh"]}}
        }"#;
        ServerConfig::from_json_str(document, "failing registry", &Settings::default())
            .map_err(Arc::new)
    }
}
