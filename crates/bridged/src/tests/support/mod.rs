//! Shared fixtures for unit and behavioural tests.

mod config_loader;
mod reporter;

use std::path::Path;

use bridge_config::{ServerConfig, Settings};

pub(crate) use config_loader::{FailingConfigLoader, TestConfigLoader};
pub(crate) use reporter::{HealthEvent, RecordingHealthReporter};

/// Two commands covering every parameter type and style.
///
/// `greet` declares `name`, `times`, `loud` and `level` in that order so
/// argument placement can be checked against shuffled requests.
pub(crate) const SAMPLE_COMMANDS: &str = r#"{
    "echo": {
        "description": "Echo a message",
        "executable": ["echo"],
        "parameters": {
            "message": {
                "description": "Text to print",
                "type": "string",
                "required": true,
                "style": "argument",
                "pattern": "[\\w ]+"
            }
        },
        "examples": [{"message": "Hello World"}]
    },
    "greet": {
        "description": "Print a greeting",
        "executable": ["printf", "%s\\n"],
        "timeout": 5,
        "parameters": {
            "name": {"type": "string", "required": true, "style": "flag", "max_length": 16},
            "times": {"type": "number", "style": "single_flag"},
            "loud": {"type": "boolean", "style": "argument"},
            "level": {"type": "string", "style": "flag", "enum": ["low", "high"]}
        }
    }
}"#;

/// Builds a validated configuration around `commands`.
///
/// `extra` is spliced in before the `commands` key and must end with a comma
/// when non-empty.
pub(crate) fn server_config(extra: &str, commands: &str) -> ServerConfig {
    server_config_at(Path::new("/tmp/bridge-test.sock"), extra, commands)
}

/// As [`server_config`], with an explicit socket path.
pub(crate) fn server_config_at(socket: &Path, extra: &str, commands: &str) -> ServerConfig {
    let document = format!(
        r#"{{
            "name": "Test Bridge",
            "description": "Bridge used by tests",
            "version": "9.9.9",
            "socket_path": "{}",
            "allowed_executable_dirs": ["/usr/bin", "/bin"],
            {extra}
            "commands": {commands}
        }}"#,
        socket.display()
    );
    ServerConfig::from_json_str(&document, "test registry", &Settings::default())
        .expect("test registry should validate")
}
