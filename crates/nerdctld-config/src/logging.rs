use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::defaults::{DEBUG_LOG_FILTER, DEFAULT_LOG_FILTER};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable single line output.
    #[default]
    Compact,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolved logging settings for the daemon telemetry layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    filter: String,
    format: LogFormat,
}

impl LogSettings {
    /// Derives settings from the process flags.
    ///
    /// An explicit filter always wins; otherwise `--debug` selects the debug
    /// filter.
    #[must_use]
    pub fn from_flags(debug: bool, filter: Option<&str>, format: LogFormat) -> Self {
        let filter = match filter.map(str::trim).filter(|value| !value.is_empty()) {
            Some(explicit) => explicit.to_owned(),
            None if debug => DEBUG_LOG_FILTER.to_owned(),
            None => DEFAULT_LOG_FILTER.to_owned(),
        };
        Self { filter, format }
    }

    /// `tracing-subscriber` filter directive.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Output format.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self::from_flags(false, None, LogFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, None, DEFAULT_LOG_FILTER)]
    #[case(true, None, DEBUG_LOG_FILTER)]
    #[case(true, Some("warn"), "warn")]
    #[case(false, Some("  "), DEFAULT_LOG_FILTER)]
    fn derives_filter(#[case] debug: bool, #[case] filter: Option<&str>, #[case] expected: &str) {
        let settings = LogSettings::from_flags(debug, filter, LogFormat::Json);
        assert_eq!(settings.filter(), expected);
        assert_eq!(settings.format(), LogFormat::Json);
    }

    #[test]
    fn parses_format_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>().ok(), Some(LogFormat::Compact));
    }
}
