//! Validated command registry.
//!
//! The registry is built once at startup and never mutated. Lookups are by
//! exact, case-sensitive name; iteration follows the order in which commands
//! and parameters were declared in the registry document.

mod build;
pub(crate) mod document;
mod executable;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

pub(crate) use build::build_registry;

/// Declared type of a command parameter.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ParameterType {
    /// UTF-8 text.
    #[default]
    String,
    /// Integer or floating point number.
    Number,
    /// `true` or `false`.
    Boolean,
}

/// How a validated parameter is placed into the argument vector.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParameterStyle {
    /// Appended positionally as the bare value.
    Argument,
    /// Appended as `--name` followed by the value.
    #[default]
    Flag,
    /// Appended as a single `--name=value` token.
    SingleFlag,
}

/// Compiled parameter pattern that must match the whole value.
#[derive(Debug, Clone)]
pub struct ParameterPattern {
    source: String,
    regex: Regex,
}

impl ParameterPattern {
    /// Compiles `source`, anchoring it so partial matches are rejected.
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{source})$"))?;
        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    /// Returns the pattern as written in the registry.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Reports whether `value` matches the pattern in full.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Schema of a single command parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    name: String,
    description: String,
    kind: ParameterType,
    required: bool,
    style: ParameterStyle,
    pattern: Option<ParameterPattern>,
    allowed: Option<Vec<Value>>,
    max_length: Option<usize>,
}

impl ParameterSpec {
    /// Parameter name as it appears in requests and flags.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared type.
    #[must_use]
    pub const fn kind(&self) -> ParameterType {
        self.kind
    }

    /// Whether requests must supply the parameter.
    #[must_use]
    pub const fn required(&self) -> bool {
        self.required
    }

    /// Placement style in the argument vector.
    #[must_use]
    pub const fn style(&self) -> ParameterStyle {
        self.style
    }

    /// Full-match pattern for string parameters.
    #[must_use]
    pub const fn pattern(&self) -> Option<&ParameterPattern> {
        self.pattern.as_ref()
    }

    /// Permitted values, already checked against [`Self::kind`].
    #[must_use]
    pub fn allowed_values(&self) -> Option<&[Value]> {
        self.allowed.as_deref()
    }

    /// Maximum length in characters of the rendered value.
    #[must_use]
    pub const fn max_length(&self) -> Option<usize> {
        self.max_length
    }
}

/// A registered command.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    name: String,
    description: String,
    executable: Vec<String>,
    program: PathBuf,
    timeout: Duration,
    cwd: PathBuf,
    env: BTreeMap<String, String>,
    parameters: Vec<ParameterSpec>,
    examples: Vec<Value>,
    parse_json: bool,
}

impl CommandSpec {
    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Executable template as written in the registry.
    #[must_use]
    pub fn executable(&self) -> &[String] {
        &self.executable
    }

    /// Absolute path of the program resolved inside an allowed directory.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Fixed arguments following the program in the template.
    #[must_use]
    pub fn fixed_arguments(&self) -> &[String] {
        self.executable.get(1..).unwrap_or_default()
    }

    /// Wall-clock limit for a single run.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Working directory of the spawned process.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Complete environment of the spawned process.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Display-only usage examples.
    #[must_use]
    pub fn examples(&self) -> &[Value] {
        &self.examples
    }

    /// Whether stdout should be parsed as JSON for the response.
    #[must_use]
    pub const fn parse_json(&self) -> bool {
        self.parse_json
    }
}

/// Immutable lookup table of registered commands.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandSpec>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    /// Looks up a command by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.index
            .get(name)
            .and_then(|position| self.commands.get(*position))
    }

    /// Iterates over commands in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter()
    }

    /// Returns the command names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(CommandSpec::name).collect()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
