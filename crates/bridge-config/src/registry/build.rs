use std::collections::{HashMap, HashSet};
use std::time::Duration;

use camino::Utf8PathBuf;
use serde_json::Value;

use crate::RESERVED_COMMAND_PREFIX;
use crate::defaults::{MAX_DURATION_SECS, default_command_env};
use crate::error::ConfigError;
use crate::registry::document::{CommandDocument, NamedEntries, ParameterDocument};
use crate::registry::executable::resolve_executable;
use crate::registry::{CommandRegistry, CommandSpec, ParameterPattern, ParameterSpec, ParameterType};

/// Validates every command document and assembles the lookup table.
pub(crate) fn build_registry(
    entries: NamedEntries<CommandDocument>,
    allowed_dirs: &[Utf8PathBuf],
) -> Result<CommandRegistry, ConfigError> {
    let mut commands = Vec::new();
    let mut index = HashMap::new();
    for (name, document) in entries.into_inner() {
        check_command_name(&name)?;
        if index.contains_key(&name) {
            return Err(ConfigError::DuplicateCommand { name });
        }
        let spec = build_command(name, document, allowed_dirs)?;
        index.insert(spec.name.clone(), commands.len());
        commands.push(spec);
    }
    Ok(CommandRegistry { commands, index })
}

fn check_command_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::EmptyCommandName);
    }
    if name.starts_with(RESERVED_COMMAND_PREFIX) {
        return Err(ConfigError::ReservedCommandName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn build_command(
    name: String,
    document: CommandDocument,
    allowed_dirs: &[Utf8PathBuf],
) -> Result<CommandSpec, ConfigError> {
    let Some(binary) = document.executable.first() else {
        return Err(ConfigError::EmptyExecutable { command: name });
    };
    let program = resolve_executable(binary, allowed_dirs).ok_or_else(|| {
        ConfigError::ExecutableNotAllowed {
            command: name.clone(),
            executable: binary.clone(),
        }
    })?;

    if document.timeout == 0 || document.timeout > MAX_DURATION_SECS {
        return Err(ConfigError::InvalidTimeout {
            command: name,
            max: MAX_DURATION_SECS,
        });
    }
    if !document.cwd.is_absolute() {
        return Err(ConfigError::RelativeWorkingDirectory {
            command: name,
            cwd: document.cwd,
        });
    }

    let parameters = build_parameters(&name, document.parameters)?;
    Ok(CommandSpec {
        description: document.description,
        executable: document.executable,
        program,
        timeout: Duration::from_secs(document.timeout),
        cwd: document.cwd.into_std_path_buf(),
        env: document.env.unwrap_or_else(default_command_env),
        parameters,
        examples: document.examples,
        parse_json: document.response_format.parse_json,
        name,
    })
}

fn build_parameters(
    command: &str,
    entries: NamedEntries<ParameterDocument>,
) -> Result<Vec<ParameterSpec>, ConfigError> {
    let mut seen = HashSet::new();
    let mut parameters = Vec::new();
    for (name, document) in entries.into_inner() {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyParameterName {
                command: command.to_owned(),
            });
        }
        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateParameter {
                command: command.to_owned(),
                parameter: name,
            });
        }
        parameters.push(build_parameter(command, name, document)?);
    }
    Ok(parameters)
}

fn build_parameter(
    command: &str,
    name: String,
    document: ParameterDocument,
) -> Result<ParameterSpec, ConfigError> {
    let pattern = match document.pattern.as_deref() {
        None => None,
        Some(_) if document.kind != ParameterType::String => {
            return Err(ConfigError::PatternRequiresString {
                command: command.to_owned(),
                parameter: name,
            });
        }
        Some(source) => Some(ParameterPattern::compile(source).map_err(|error| {
            ConfigError::InvalidPattern {
                command: command.to_owned(),
                parameter: name.clone(),
                source: Box::new(error),
            }
        })?),
    };

    if let Some(values) = document.allowed.as_deref() {
        if values.is_empty() {
            return Err(ConfigError::EmptyEnum {
                command: command.to_owned(),
                parameter: name,
            });
        }
        if !values.iter().all(|value| value_has_type(value, document.kind)) {
            return Err(ConfigError::EnumTypeMismatch {
                command: command.to_owned(),
                parameter: name,
            });
        }
    }

    if document.max_length == Some(0) {
        return Err(ConfigError::ZeroLimit {
            field: "max_length",
        });
    }

    Ok(ParameterSpec {
        name,
        description: document.description,
        kind: document.kind,
        required: document.required,
        style: document.style,
        pattern,
        allowed: document.allowed,
        max_length: document.max_length,
    })
}

fn value_has_type(value: &Value, kind: ParameterType) -> bool {
    matches!(
        (kind, value),
        (ParameterType::String, Value::String(_))
            | (ParameterType::Number, Value::Number(_))
            | (ParameterType::Boolean, Value::Bool(_))
    )
}
