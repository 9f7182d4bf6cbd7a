//! Colored terminal output.

use super::Formatter;
use chrono::{DateTime, Datelike, Local, Timelike};
use colored::{ColoredString, Colorize};
use powerctl_protocol::{Home, Price, PriceInfo, PriceLevel, TelemetryRecord};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

/// Human-friendly output with colors, price bars and a current-hour marker.
pub struct PrettyFormatter {
    now: Option<DateTime<Local>>,
}

impl PrettyFormatter {
    pub fn new() -> Self {
        Self { now: None }
    }

    /// Uses a fixed clock for the current-hour marker.
    #[cfg(test)]
    pub fn at(now: DateTime<Local>) -> Self {
        Self { now: Some(now) }
    }

    fn now(&self) -> DateTime<Local> {
        self.now.unwrap_or_else(Local::now)
    }

    fn price_list(&self, prices: &[Price]) -> String {
        let mut out = String::new();
        let min = prices.iter().map(|p| p.total).fold(f64::INFINITY, f64::min);
        let max = prices.iter().map(|p| p.total).fold(f64::NEG_INFINITY, f64::max);
        let now = self.now();

        for price in prices {
            let local = price.starts_at.with_timezone(&Local);
            let hour = local.format("%H:%M");
            let current = local.hour() == now.hour() && local.day() == now.day();
            let marker = if current {
                format!("{} ", "▶".bright_yellow())
            } else {
                "  ".to_string()
            };

            if max > min {
                let len = ((BAR_WIDTH as f64) * (price.total - min) / (max - min)) as usize;
                let len = len.clamp(1, BAR_WIDTH);
                let bar = format!("{}{}", "█".repeat(len), "░".repeat(BAR_WIDTH - len));
                let _ = writeln!(
                    out,
                    "   {}{} {} {}",
                    marker,
                    hour,
                    level_color(price.level, format!("{}{:.2}", bar, price.total)),
                    price.currency.dimmed()
                );
            } else {
                let _ = writeln!(
                    out,
                    "   {}{} {:.2} {}",
                    marker, hour, price.total, price.currency
                );
            }
        }
        out
    }
}

impl Default for PrettyFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for PrettyFormatter {
    fn home(&self, home: &Home) -> String {
        let mut out = String::new();
        let title = home.title();
        let _ = writeln!(out, "\n{}", format!(" {}", title).bold().cyan());
        let _ = writeln!(out, "{}\n", "─".repeat(title.chars().count() + 2).dimmed());

        if let Some(address) = home.address.as_ref() {
            if let Some(line) = address.address1.as_deref().filter(|s| !s.is_empty()) {
                let _ = writeln!(out, "  {}", "📍 Address".bold());
                let _ = writeln!(out, "     {}", line);
                let postal = address.postal_code.as_deref().unwrap_or_default();
                let city = address.city.as_deref().unwrap_or_default();
                if !postal.is_empty() || !city.is_empty() {
                    let country = address.country.as_deref().unwrap_or_default();
                    let _ = writeln!(out, "     {} {}, {}", postal, city, country);
                }
                out.push('\n');
            }
        }

        let _ = writeln!(out, "  {}", "🏠 Details".bold());
        if let Some(size) = home.size.filter(|s| *s > 0) {
            let _ = writeln!(out, "     Size:      {}", format!("{} m²", size).bright_cyan());
        }
        if let Some(kind) = home.home_type.as_deref().filter(|s| !s.is_empty()) {
            let _ = writeln!(out, "     Type:      {}", kind);
        }
        if let Some(residents) = home.number_of_residents.filter(|n| *n > 0) {
            let _ = writeln!(out, "     Residents: {}", residents);
        }
        if let Some(fuse) = home.main_fuse_size.filter(|n| *n > 0) {
            let _ = writeln!(out, "     Main Fuse: {} A", fuse);
        }
        out.push('\n');

        let _ = writeln!(out, "  {}", "⚡ Pulse".bold());
        if home.is_live_capable() {
            let _ = writeln!(out, "     Status: {}", "● Connected".bright_green());
        } else {
            let _ = writeln!(out, "     Status: {}", "○ Not connected".dimmed());
        }

        let _ = writeln!(out, "\n  {}", format!("ID: {}", home.id).dimmed());
        out
    }

    fn homes(&self, homes: &[Home]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}", "⚡ Tibber Homes".bold().cyan());
        let _ = writeln!(out, "{}", "─".repeat(16).dimmed());
        for home in homes {
            out.push_str(&self.home(home));
            out.push('\n');
        }
        out
    }

    fn prices(&self, prices: &PriceInfo) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}", "⚡ Electricity Prices".bold().cyan());
        let _ = writeln!(out, "{}\n", "─".repeat(22).dimmed());

        if let Some(current) = prices.current.as_ref() {
            let _ = writeln!(
                out,
                "  {}  {}  {}\n",
                "NOW".bold().bright_yellow(),
                level_color(
                    current.level,
                    format!("{:.2} {}/kWh", current.total, current.currency)
                )
                .bold(),
                level_label(current.level)
            );
        }

        if !prices.today.is_empty() {
            let _ = writeln!(out, "  {}", "📅 Today".bold());
            out.push_str(&self.price_list(&prices.today));
            out.push('\n');
        }

        let _ = writeln!(out, "  {}", "📅 Tomorrow".bold());
        if prices.tomorrow.is_empty() {
            let _ = writeln!(
                out,
                "     {}",
                "Not yet available (published ~13:00)".dimmed()
            );
        } else {
            out.push_str(&self.price_list(&prices.tomorrow));
        }
        out
    }

    fn telemetry(&self, record: &TelemetryRecord) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}", "⚡ Live Power".bold().cyan());
        let _ = writeln!(out, "{}\n", "─".repeat(14).dimmed());

        let _ = writeln!(out, "  {}\n", power_color(record.power).bold());

        if let Some(production) = record.power_production.filter(|p| *p > 0.0) {
            let _ = writeln!(out, "  {} {:.0} W", "☀️  Production:".green(), production);
        }

        let currency = record.currency.as_deref().unwrap_or_default();
        let _ = writeln!(out, "  {}", "📊 Today".bold());
        let _ = writeln!(
            out,
            "     Consumed: {}",
            format!("{:.2} kWh", record.accumulated_consumption.unwrap_or_default()).bright_cyan()
        );
        let _ = writeln!(
            out,
            "     Cost:     {}",
            format!("{:.2} {}", record.accumulated_cost.unwrap_or_default(), currency)
                .bright_yellow()
        );

        if let Some(voltages) = record.voltages().filter(|v| v[0] > 0.0) {
            let currents = record.currents().unwrap_or_default();
            let _ = writeln!(out, "\n  {}", "🔌 Grid".bold());
            let _ = writeln!(
                out,
                "     Voltage: {:.0} / {:.0} / {:.0} V",
                voltages[0], voltages[1], voltages[2]
            );
            let _ = writeln!(
                out,
                "     Current: {:.1} / {:.1} / {:.1} A",
                currents[0], currents[1], currents[2]
            );
        }

        let local = record.timestamp.with_timezone(&Local);
        let _ = writeln!(out, "\n  {}", local.format("%H:%M:%S").to_string().dimmed());
        out
    }
}

/// Consumption color bands: green, yellow above 2 kW, red above 5 kW.
fn power_color(power: f64) -> ColoredString {
    let text = format!("{:.0} W", power);
    if power > 5000.0 {
        text.bright_red()
    } else if power > 2000.0 {
        text.bright_yellow()
    } else {
        text.bright_green()
    }
}

fn level_color(level: PriceLevel, text: String) -> ColoredString {
    match level {
        PriceLevel::VeryCheap => text.bright_green(),
        PriceLevel::Cheap => text.green(),
        PriceLevel::Normal => text.yellow(),
        PriceLevel::Expensive => text.red(),
        PriceLevel::VeryExpensive => text.bright_red(),
        PriceLevel::Unknown => text.normal(),
    }
}

fn level_label(level: PriceLevel) -> ColoredString {
    match level {
        PriceLevel::Unknown => level.label().normal(),
        _ => level_color(level, format!("● {}", level.label())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;
    use chrono::TimeZone;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn test_home_sections() {
        plain();
        let out = PrettyFormatter::new().home(&fixtures::home());
        assert!(out.contains(" Cabin"));
        assert!(out.contains("Storgata 1"));
        assert!(out.contains("0150 Oslo, NO"));
        assert!(out.contains("Size:      120 m²"));
        assert!(out.contains("Main Fuse: 25 A"));
        assert!(out.contains("● Connected"));
        assert!(out.contains("ID: home-1"));
    }

    #[test]
    fn test_home_without_pulse() {
        plain();
        let mut home = fixtures::home();
        home.features.real_time_consumption_enabled = false;
        home.address = None;
        let out = PrettyFormatter::new().home(&home);
        assert!(out.contains("○ Not connected"));
        assert!(!out.contains("Address"));
    }

    #[test]
    fn test_prices_without_tomorrow() {
        plain();
        let out = PrettyFormatter::new().prices(&fixtures::prices(false));
        assert!(out.contains("NOW"));
        assert!(out.contains("2.00 NOK/kWh"));
        assert!(out.contains("● Expensive"));
        assert!(out.contains("📅 Today"));
        assert!(out.contains("Not yet available (published ~13:00)"));
    }

    #[test]
    fn test_price_bars_scale_between_min_and_max() {
        plain();
        let out = PrettyFormatter::new().prices(&fixtures::prices(true));
        // cheapest hour still gets a one-cell bar, the most expensive a full one
        assert!(out.contains(&format!("█{}1.00", "░".repeat(19))));
        assert!(out.contains(&format!("{}2.00", "█".repeat(20))));
        assert!(!out.contains("Not yet available"));
    }

    #[test]
    fn test_current_hour_marker() {
        plain();
        let prices = fixtures::prices(false);
        let now = prices.today[1].starts_at.with_timezone(&Local);
        let out = PrettyFormatter::at(now).prices(&prices);
        assert_eq!(out.matches('▶').count(), 1);

        let elsewhere = Local.with_ymd_and_hms(2030, 6, 15, 12, 0, 0).unwrap();
        let out = PrettyFormatter::at(elsewhere).prices(&prices);
        assert_eq!(out.matches('▶').count(), 0);
    }

    #[test]
    fn test_telemetry() {
        plain();
        let mut record = fixtures::telemetry(1234.4);
        let out = PrettyFormatter::new().telemetry(&record);
        assert!(out.contains("1234 W"));
        assert!(out.contains("12.50 kWh"));
        assert!(out.contains("23.40 NOK"));
        assert!(!out.contains("Production"));
        assert!(!out.contains("Grid"));

        record.power_production = Some(300.0);
        record.voltage_phase1 = Some(230.0);
        record.voltage_phase2 = Some(231.0);
        record.voltage_phase3 = Some(229.0);
        record.current_l1 = Some(5.0);
        let out = PrettyFormatter::new().telemetry(&record);
        assert!(out.contains("300 W"));
        assert!(out.contains("Voltage: 230 / 231 / 229 V"));
        assert!(out.contains("Current: 5.0 / 0.0 / 0.0 A"));
    }

    #[test]
    fn test_power_color_bands() {
        assert_eq!(power_color(1500.0), "1500 W".bright_green());
        assert_eq!(power_color(2500.0), "2500 W".bright_yellow());
        assert_eq!(power_color(6000.0), "6000 W".bright_red());
    }
}
