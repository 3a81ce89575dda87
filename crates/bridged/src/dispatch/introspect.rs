//! Capability manifest served by the introspection command.
//!
//! The manifest is rendered straight from the shared configuration in
//! registry order. Only display fields and parameter schemas are written;
//! executables, working directories, environments, timeouts and every
//! security setting stay server-side.

use std::sync::Arc;

use bridge_config::{CommandSpec, ParameterSpec, ServerConfig};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Public view of the server and its commands.
#[derive(Debug, Clone)]
pub(crate) struct ServerInfo {
    config: Arc<ServerConfig>,
}

impl ServerInfo {
    pub(crate) const fn new(config: Arc<ServerConfig>) -> Self {
        Self { config }
    }
}

impl Serialize for ServerInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let config = &*self.config;
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("name", config.name())?;
        map.serialize_entry("description", config.description())?;
        map.serialize_entry(
            "version",
            config.version().unwrap_or(env!("CARGO_PKG_VERSION")),
        )?;
        map.serialize_entry("commands", &Commands(config))?;
        map.end()
    }
}

struct Commands<'a>(&'a ServerConfig);

impl Serialize for Commands<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .commands()
                .iter()
                .map(|command| (command.name(), CommandEntry(command))),
        )
    }
}

struct CommandEntry<'a>(&'a CommandSpec);

impl Serialize for CommandEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("description", self.0.description())?;
        map.serialize_entry("parameters", &Parameters(self.0.parameters()))?;
        map.serialize_entry("examples", self.0.examples())?;
        map.end()
    }
}

struct Parameters<'a>(&'a [ParameterSpec]);

impl Serialize for Parameters<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|parameter| (parameter.name(), ParameterEntry(parameter))),
        )
    }
}

struct ParameterEntry<'a>(&'a ParameterSpec);

impl Serialize for ParameterEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let parameter = self.0;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("description", parameter.description())?;
        map.serialize_entry("type", &parameter.kind())?;
        map.serialize_entry("required", &parameter.required())?;
        if let Some(pattern) = parameter.pattern() {
            map.serialize_entry("pattern", pattern.as_str())?;
        }
        if let Some(allowed) = parameter.allowed_values() {
            map.serialize_entry("enum", allowed)?;
        }
        if let Some(max_length) = parameter.max_length() {
            map.serialize_entry("max_length", &max_length)?;
        }
        map.end()
    }
}
