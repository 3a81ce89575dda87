use std::fs;
use std::path::PathBuf;

use bridge_config::{ConfigError, ServerConfig, Settings};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct RegistryFile {
    _dir: TempDir,
    path: PathBuf,
}

#[fixture]
fn registry_file() -> RegistryFile {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("registry.json");
    RegistryFile { _dir: dir, path }
}

fn load(file: &RegistryFile, contents: &str) -> Result<ServerConfig, ConfigError> {
    fs::write(&file.path, contents).expect("write registry");
    ServerConfig::load(&Settings::for_path(&file.path))
}

#[rstest]
fn missing_files_report_their_path(registry_file: RegistryFile) {
    let error = ServerConfig::load(&Settings::for_path(&registry_file.path))
        .expect_err("missing file must fail");
    match error {
        ConfigError::Read { path, .. } => assert_eq!(path, registry_file.path),
        other => panic!("expected read error, got {other:?}"),
    }
}

#[rstest]
fn malformed_json_reports_the_file(registry_file: RegistryFile) {
    let error = load(&registry_file, r#"{"name": "x", "socket_path": "#)
        .expect_err("truncated document must fail");
    assert!(matches!(error, ConfigError::Parse { .. }));
    assert!(
        error.to_string().contains("registry.json"),
        "expected file name in {error}"
    );
}

#[rstest]
fn missing_required_keys_are_fatal(registry_file: RegistryFile) {
    let error = load(&registry_file, r#"{"name": "x", "commands": {}}"#)
        .expect_err("socket_path is required");
    assert!(error.to_string().contains("socket_path"), "{error}");
}

#[rstest]
fn duplicate_commands_in_a_file_are_fatal(registry_file: RegistryFile) {
    let error = load(
        &registry_file,
        r#"{
            "name": "dupes",
            "socket_path": "/tmp/dupes.sock",
            "allowed_executable_dirs": ["/usr/bin", "/bin"],
            "commands": {
                "now": {"executable": ["date"]},
                "now": {"executable": ["echo"]}
            }
        }"#,
    )
    .expect_err("duplicates must fail");
    assert!(matches!(error, ConfigError::DuplicateCommand { ref name } if name == "now"));
}

#[rstest]
fn executables_outside_allowed_dirs_are_fatal(registry_file: RegistryFile) {
    let error = load(
        &registry_file,
        r#"{
            "name": "escape",
            "socket_path": "/tmp/escape.sock",
            "allowed_executable_dirs": ["/nonexistent/bin"],
            "commands": {"list": {"executable": ["/bin/ls", "-l"]}}
        }"#,
    )
    .expect_err("escape must fail");
    assert!(matches!(error, ConfigError::ExecutableNotAllowed { .. }));
}

#[rstest]
fn empty_registries_are_valid(registry_file: RegistryFile) {
    let config = load(
        &registry_file,
        r#"{"name": "empty", "socket_path": "/tmp/empty.sock", "commands": {}}"#,
    )
    .expect("empty registry loads");
    assert!(config.commands().is_empty());
}
