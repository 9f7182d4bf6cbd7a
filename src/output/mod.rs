//! Output formatting for homes, prices and live telemetry.

mod json;
mod markdown;
mod pretty;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use pretty::PrettyFormatter;

use powerctl_protocol::{Home, PriceInfo, TelemetryRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Renders API data for the terminal.
pub trait Formatter {
    fn home(&self, home: &Home) -> String;
    fn homes(&self, homes: &[Home]) -> String;
    fn prices(&self, prices: &PriceInfo) -> String;
    /// One live record; called once per measurement.
    fn telemetry(&self, record: &TelemetryRecord) -> String;
}

/// Output format selected by config or `--format`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
    #[serde(alias = "md")]
    #[value(alias = "md")]
    Markdown,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        }
    }

    pub fn formatter(&self) -> Box<dyn Formatter> {
        match self {
            OutputFormat::Pretty => Box::new(PrettyFormatter::new()),
            OutputFormat::Json => Box::new(JsonFormatter),
            OutputFormat::Markdown => Box::new(MarkdownFormatter),
        }
    }

    /// Streaming formats that redraw the screen for every record.
    pub fn redraws(&self) -> bool {
        !matches!(self, OutputFormat::Json)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised format name.
#[derive(Debug, thiserror::Error)]
#[error("invalid format: {0}. Use 'pretty', 'json', or 'markdown'")]
pub struct InvalidFormat(pub String);

impl FromStr for OutputFormat {
    type Err = InvalidFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "" => Ok(OutputFormat::Pretty),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(InvalidFormat(s.to_string())),
        }
    }
}
