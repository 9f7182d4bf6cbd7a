//! Markdown tables.

use super::Formatter;
use chrono::Local;
use powerctl_protocol::{Home, Price, PriceInfo, PriceLevel, TelemetryRecord};
use std::fmt::Write;

pub struct MarkdownFormatter;

fn level_code(level: PriceLevel) -> &'static str {
    match level {
        PriceLevel::VeryCheap => "VERY_CHEAP",
        PriceLevel::Cheap => "CHEAP",
        PriceLevel::Normal => "NORMAL",
        PriceLevel::Expensive => "EXPENSIVE",
        PriceLevel::VeryExpensive => "VERY_EXPENSIVE",
        PriceLevel::Unknown => "UNKNOWN",
    }
}

fn price_table(prices: &[Price]) -> String {
    let mut out = String::from("| Time | Price | Level |\n|------|-------|-------|\n");
    for price in prices {
        let _ = writeln!(
            out,
            "| {} | {:.2} {} | {} |",
            price.starts_at.with_timezone(&Local).format("%H:%M"),
            price.total,
            price.currency,
            level_code(price.level)
        );
    }
    out
}

impl Formatter for MarkdownFormatter {
    fn home(&self, home: &Home) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "## {}\n", home.title());
        out.push_str("| Property | Value |\n|----------|-------|\n");
        let _ = writeln!(out, "| ID | `{}` |", home.id);

        if let Some(address) = home.address.as_ref().filter(|a| a.address1.is_some()) {
            let _ = writeln!(out, "| Address | {} |", address.one_line());
        }
        if let Some(size) = home.size.filter(|s| *s > 0) {
            let _ = writeln!(out, "| Size | {} m² |", size);
        }
        if let Some(kind) = home.home_type.as_deref().filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "| Type | {} |", kind);
        }
        if let Some(residents) = home.number_of_residents.filter(|n| *n > 0) {
            let _ = writeln!(out, "| Residents | {} |", residents);
        }
        if let Some(fuse) = home.main_fuse_size.filter(|n| *n > 0) {
            let _ = writeln!(out, "| Main Fuse | {} A |", fuse);
        }
        let pulse = if home.is_live_capable() { "Yes" } else { "No" };
        let _ = writeln!(out, "| Pulse Enabled | {} |", pulse);
        out
    }

    fn homes(&self, homes: &[Home]) -> String {
        let mut out = String::from("# Tibber Homes\n\n");
        let rendered: Vec<String> = homes.iter().map(|h| self.home(h)).collect();
        out.push_str(&rendered.join("\n---\n\n"));
        out
    }

    fn prices(&self, prices: &PriceInfo) -> String {
        let mut out = String::from("# Electricity Prices\n\n");

        if let Some(current) = prices.current.as_ref() {
            let _ = writeln!(
                out,
                "## Current Price\n\n**{:.2} {}/kWh** ({})\n",
                current.total,
                current.currency,
                level_code(current.level)
            );
        }

        if !prices.today.is_empty() {
            out.push_str("## Today\n\n");
            out.push_str(&price_table(&prices.today));
            out.push('\n');
        }

        if prices.tomorrow.is_empty() {
            out.push_str("*Tomorrow's prices not yet available (published around 13:00)*\n");
        } else {
            out.push_str("## Tomorrow\n\n");
            out.push_str(&price_table(&prices.tomorrow));
        }
        out
    }

    fn telemetry(&self, record: &TelemetryRecord) -> String {
        let mut out = String::from("## Live Power\n\n| Metric | Value |\n|--------|-------|\n");
        let _ = writeln!(out, "| Power | {:.0} W |", record.power);
        if let Some(production) = record.power_production.filter(|p| *p > 0.0) {
            let _ = writeln!(out, "| Production | {:.0} W |", production);
        }
        let _ = writeln!(
            out,
            "| Today | {:.2} kWh |",
            record.accumulated_consumption.unwrap_or_default()
        );
        let _ = writeln!(
            out,
            "| Cost | {:.2} {} |",
            record.accumulated_cost.unwrap_or_default(),
            record.currency.as_deref().unwrap_or_default()
        );
        if let Some(v) = record.voltages().filter(|v| v[0] > 0.0) {
            let _ = writeln!(out, "| Voltage | {:.1} / {:.1} / {:.1} V |", v[0], v[1], v[2]);
        }
        if let Some(c) = record.currents().filter(|c| c[0] > 0.0) {
            let _ = writeln!(out, "| Current | {:.1} / {:.1} / {:.1} A |", c[0], c[1], c[2]);
        }
        let _ = writeln!(out, "| Updated | {} |", record.timestamp.to_rfc3339());
        out
    }
}
