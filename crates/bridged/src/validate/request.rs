//! Request envelope parsing.

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::RequestError;

/// Parsed but not yet validated request.
#[derive(Deserialize)]
pub(crate) struct RequestEnvelope {
    command: String,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
    #[serde(default)]
    auth_token_hash: Option<String>,
}

impl RequestEnvelope {
    /// Checks the frame size, then decodes the JSON object.
    pub(crate) fn parse(raw: &[u8], max_request_size: usize) -> Result<Self, RequestError> {
        if raw.len() > max_request_size {
            return Err(RequestError::TooLarge {
                size: raw.len(),
                limit: max_request_size,
            });
        }
        let trimmed = raw.trim_ascii();
        if trimmed.is_empty() {
            return Err(RequestError::malformed("empty request"));
        }
        if trimmed.first() != Some(&b'{') {
            return Err(RequestError::malformed("request must be a JSON object"));
        }
        serde_json::from_slice(trimmed).map_err(|error| RequestError::malformed(error.to_string()))
    }

    pub(crate) fn command(&self) -> &str {
        &self.command
    }

    pub(crate) fn auth_token_hash(&self) -> Option<&str> {
        self.auth_token_hash.as_deref()
    }

    /// Returns a supplied parameter, treating JSON `null` as absent.
    pub(crate) fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .as_ref()
            .and_then(|parameters| parameters.get(name))
            .filter(|value| !value.is_null())
    }

    pub(crate) fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .flat_map(|parameters| parameters.keys().map(String::as_str))
    }
}

impl fmt::Debug for RequestEnvelope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RequestEnvelope")
            .field("command", &self.command)
            .field("parameters", &self.parameter_names().collect::<Vec<_>>())
            .field(
                "auth_token_hash",
                &self.auth_token_hash.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
