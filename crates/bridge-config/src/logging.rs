use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for journald or log shippers.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolved logging preferences for the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    filter: String,
    format: LogFormat,
}

impl LoggingSettings {
    /// Builds logging settings from an explicit filter and format.
    #[must_use]
    pub fn new(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            filter: filter.into(),
            format,
        }
    }

    /// Returns the `tracing` filter directive.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns the output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self::new(crate::defaults::DEFAULT_LOG_FILTER, LogFormat::default())
    }
}

/// Maps a registry `log_level` such as `"INFO"` or `"warning"` to a filter directive.
pub(crate) fn filter_from_level(level: &str) -> String {
    let lowered = level.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "warning" => String::from("warn"),
        "critical" | "fatal" => String::from("error"),
        _ => lowered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("INFO", "info")]
    #[case("WARNING", "warn")]
    #[case(" debug ", "debug")]
    #[case("CRITICAL", "error")]
    fn registry_levels_map_to_filters(#[case] level: &str, #[case] expected: &str) {
        assert_eq!(filter_from_level(level), expected);
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("COMPACT".parse::<LogFormat>().ok(), Some(LogFormat::Compact));
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
