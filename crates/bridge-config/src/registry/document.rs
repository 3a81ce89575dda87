//! Raw serde shape of the JSON registry document.
//!
//! These types mirror the file one-to-one and carry no invariants; the
//! validated model is built from them in [`crate::config`].

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde_json::Value;

use crate::defaults::{
    default_command_cwd, default_command_timeout, default_max_connections,
    default_max_output_size, default_max_request_size, default_rate_limit_requests,
    default_rate_limit_window, default_true,
};
use crate::registry::{ParameterStyle, ParameterType};
use crate::socket::SocketPermissions;

/// JSON object decoded as an ordered list of entries.
///
/// Unlike a map, repeated keys are kept so that validation can report them
/// instead of letting the last entry win.
#[derive(Debug)]
pub(crate) struct NamedEntries<T>(Vec<(String, T)>);

impl<T> NamedEntries<T> {
    pub(crate) fn into_inner(self) -> Vec<(String, T)> {
        self.0
    }
}

impl<T> Default for NamedEntries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T> Deserialize<'de> for NamedEntries<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T> Visitor<'de> for EntriesVisitor<T>
        where
            T: Deserialize<'de>,
        {
            type Value = NamedEntries<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object keyed by name")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, T>()? {
                    entries.push(entry);
                }
                Ok(NamedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegistryDocument {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) version: Option<String>,
    pub(crate) socket_path: Utf8PathBuf,
    #[serde(default)]
    pub(crate) socket_permissions: SocketPermissions,
    #[serde(default)]
    pub(crate) log_level: Option<String>,
    #[serde(default = "default_true")]
    pub(crate) enable_rate_limit: bool,
    #[serde(default)]
    pub(crate) rate_limit: RateLimitDocument,
    #[serde(default)]
    pub(crate) auth: AuthDocument,
    #[serde(default = "default_max_request_size")]
    pub(crate) max_request_size: usize,
    #[serde(default = "default_max_output_size")]
    pub(crate) max_output_size: usize,
    #[serde(default = "default_max_connections")]
    pub(crate) max_connections: usize,
    #[serde(default)]
    pub(crate) debug: bool,
    #[serde(default)]
    pub(crate) allowed_executable_dirs: Vec<Utf8PathBuf>,
    pub(crate) commands: NamedEntries<CommandDocument>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitDocument {
    #[serde(default = "default_rate_limit_requests")]
    pub(crate) requests: u32,
    #[serde(default = "default_rate_limit_window")]
    pub(crate) window: u64,
}

impl Default for RateLimitDocument {
    fn default() -> Self {
        Self {
            requests: default_rate_limit_requests(),
            window: default_rate_limit_window(),
        }
    }
}

/// Authentication keys are optional so runtime settings can fill the gaps.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuthDocument {
    #[serde(default)]
    pub(crate) enabled: Option<bool>,
    #[serde(default)]
    pub(crate) token_hash: Option<String>,
    #[serde(default)]
    pub(crate) max_attempts: Option<u32>,
    #[serde(default)]
    pub(crate) window_seconds: Option<u64>,
    #[serde(default)]
    pub(crate) block_duration_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommandDocument {
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) executable: Vec<String>,
    #[serde(default = "default_command_timeout", alias = "timeout_seconds")]
    pub(crate) timeout: u64,
    #[serde(default = "default_command_cwd")]
    pub(crate) cwd: Utf8PathBuf,
    #[serde(default)]
    pub(crate) env: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub(crate) parameters: NamedEntries<ParameterDocument>,
    #[serde(default)]
    pub(crate) examples: Vec<Value>,
    #[serde(default)]
    pub(crate) response_format: ResponseFormatDocument,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResponseFormatDocument {
    #[serde(default)]
    pub(crate) parse_json: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParameterDocument {
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default, rename = "type")]
    pub(crate) kind: ParameterType,
    #[serde(default)]
    pub(crate) required: bool,
    #[serde(default)]
    pub(crate) style: ParameterStyle,
    #[serde(default)]
    pub(crate) pattern: Option<String>,
    #[serde(default, rename = "enum")]
    pub(crate) allowed: Option<Vec<Value>>,
    #[serde(default)]
    pub(crate) max_length: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_entries_keep_duplicates_in_document_order() {
        let entries: NamedEntries<u32> =
            serde_json::from_str(r#"{"b": 1, "a": 2, "b": 3}"#).expect("object parses");
        assert_eq!(
            entries.into_inner(),
            vec![
                (String::from("b"), 1),
                (String::from("a"), 2),
                (String::from("b"), 3)
            ]
        );
    }

    #[test]
    fn command_timeout_accepts_alias() {
        let command: CommandDocument =
            serde_json::from_str(r#"{"executable": ["date"], "timeout_seconds": 3}"#)
                .expect("command parses");
        assert_eq!(command.timeout, 3);
        assert_eq!(command.cwd.as_str(), "/");
    }
}
