//! JSON output.

use super::Formatter;
use powerctl_protocol::{Home, PriceInfo, TelemetryRecord};
use serde::Serialize;

/// Pretty-printed JSON for queries, one compact line per live record.
pub struct JsonFormatter;

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.unwrap_or_else(|e| {
        tracing::error!("Failed to serialize output: {}", e);
        String::new()
    })
}

impl Formatter for JsonFormatter {
    fn home(&self, home: &Home) -> String {
        to_json(home, true)
    }

    fn homes(&self, homes: &[Home]) -> String {
        to_json(homes, true)
    }

    fn prices(&self, prices: &PriceInfo) -> String {
        to_json(prices, true)
    }

    fn telemetry(&self, record: &TelemetryRecord) -> String {
        to_json(record, false)
    }
}
