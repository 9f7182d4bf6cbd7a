//! Domain models returned by the Tibber API.
//!
//! Field names follow the API's camelCase. Most scalar fields are optional
//! because the API reports `null` for anything a home or meter does not
//! provide.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// One real-time measurement from a Pulse meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRecord {
    /// When the meter took the measurement.
    pub timestamp: DateTime<FixedOffset>,
    /// Current consumption in W.
    pub power: f64,
    /// Current production in W.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_production: Option<f64>,
    /// kWh consumed since midnight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated_consumption: Option<f64>,
    /// kWh produced since midnight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated_production: Option<f64>,
    /// Cost since midnight, in `currency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated_cost: Option<f64>,
    /// Reward for production since midnight, in `currency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated_reward: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_phase1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_phase2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_phase3: Option<f64>,
    #[serde(rename = "currentL1", default, skip_serializing_if = "Option::is_none")]
    pub current_l1: Option<f64>,
    #[serde(rename = "currentL2", default, skip_serializing_if = "Option::is_none")]
    pub current_l2: Option<f64>,
    #[serde(rename = "currentL3", default, skip_serializing_if = "Option::is_none")]
    pub current_l3: Option<f64>,
    /// ISO 4217 currency code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl TelemetryRecord {
    /// Creates a record with only the mandatory fields set.
    pub fn new(timestamp: DateTime<FixedOffset>, power: f64) -> Self {
        Self {
            timestamp,
            power,
            power_production: None,
            accumulated_consumption: None,
            accumulated_production: None,
            accumulated_cost: None,
            accumulated_reward: None,
            min_power: None,
            average_power: None,
            max_power: None,
            voltage_phase1: None,
            voltage_phase2: None,
            voltage_phase3: None,
            current_l1: None,
            current_l2: None,
            current_l3: None,
            currency: None,
        }
    }

    /// Per-phase voltages, if the meter reports them.
    pub fn voltages(&self) -> Option<[f64; 3]> {
        Some([
            self.voltage_phase1?,
            self.voltage_phase2.unwrap_or_default(),
            self.voltage_phase3.unwrap_or_default(),
        ])
    }

    /// Per-phase currents, if the meter reports them.
    pub fn currents(&self) -> Option<[f64; 3]> {
        Some([
            self.current_l1?,
            self.current_l2.unwrap_or_default(),
            self.current_l3.unwrap_or_default(),
        ])
    }
}

/// A Tibber home.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Home {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_nickname: Option<String>,
    /// Living area in m².
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub home_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_residents: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_heating_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_ventilation_system: Option<bool>,
    /// Main fuse rating in A.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_fuse_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub features: Features,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_subscription: Option<HomeSubscription>,
}

impl Home {
    /// Display name: nickname, then first address line, then "Home".
    pub fn title(&self) -> &str {
        self.app_nickname
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.address
                    .as_ref()
                    .and_then(|a| a.address1.as_deref())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or("Home")
    }

    /// Returns whether a Pulse is streaming for this home.
    pub fn is_live_capable(&self) -> bool {
        self.features.real_time_consumption_enabled
    }

    /// Price information, if the home has an active subscription.
    pub fn price_info(&self) -> Option<&PriceInfo> {
        self.current_subscription
            .as_ref()
            .and_then(|s| s.price_info.as_ref())
    }
}

/// Postal address of a home.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
}

impl Address {
    /// "Street 1, 0150 Oslo" style single line.
    pub fn one_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(line) = self.address1.as_deref().filter(|s| !s.is_empty()) {
            parts.push(line.to_string());
        }
        let postal = self.postal_code.as_deref().unwrap_or_default();
        let city = self.city.as_deref().unwrap_or_default();
        if !postal.is_empty() || !city.is_empty() {
            parts.push(format!("{} {}", postal, city).trim().to_string());
        }
        parts.join(", ")
    }
}

/// Feature flags of a home.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default)]
    pub real_time_consumption_enabled: bool,
}

/// The home's current power subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSubscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_info: Option<PriceInfo>,
}

/// Price classification relative to the trailing average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceLevel {
    VeryCheap,
    Cheap,
    Normal,
    Expensive,
    VeryExpensive,
    #[serde(other)]
    Unknown,
}

impl PriceLevel {
    /// Human label, e.g. "Very Cheap".
    pub fn label(&self) -> &'static str {
        match self {
            PriceLevel::VeryCheap => "Very Cheap",
            PriceLevel::Cheap => "Cheap",
            PriceLevel::Normal => "Normal",
            PriceLevel::Expensive => "Expensive",
            PriceLevel::VeryExpensive => "Very Expensive",
            PriceLevel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Price for one hour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Energy plus tax, per kWh.
    pub total: f64,
    pub energy: f64,
    pub tax: f64,
    pub starts_at: DateTime<FixedOffset>,
    pub level: PriceLevel,
    pub currency: String,
}

/// Current, today's and tomorrow's prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Price>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub today: Vec<Price>,
    /// Empty until the day-ahead auction is published (around 13:00).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tomorrow: Vec<Price>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_home() -> Home {
        serde_json::from_value(json!({
            "id": "home-1",
            "appNickname": null,
            "size": 120,
            "type": "HOUSE",
            "numberOfResidents": 3,
            "mainFuseSize": 25,
            "address": {
                "address1": "Storgata 1",
                "postalCode": "0150",
                "city": "Oslo",
                "country": "NO"
            },
            "features": {"realTimeConsumptionEnabled": true}
        }))
        .unwrap()
    }

    #[test]
    fn test_home_from_api_json() {
        let home = sample_home();
        assert_eq!(home.id, "home-1");
        assert_eq!(home.app_nickname, None);
        assert_eq!(home.home_type.as_deref(), Some("HOUSE"));
        assert_eq!(home.size, Some(120));
        assert!(home.is_live_capable());
        assert!(home.price_info().is_none());
    }

    #[test]
    fn test_home_title_fallbacks() {
        let mut home = sample_home();
        assert_eq!(home.title(), "Storgata 1");

        home.app_nickname = Some("Cabin".to_string());
        assert_eq!(home.title(), "Cabin");

        home.app_nickname = Some(String::new());
        home.address = None;
        assert_eq!(home.title(), "Home");
    }

    #[test]
    fn test_address_one_line() {
        let home = sample_home();
        assert_eq!(home.address.unwrap().one_line(), "Storgata 1, 0150 Oslo");
        assert_eq!(Address::default().one_line(), "");
    }

    #[test]
    fn test_features_default_when_missing() {
        let home: Home = serde_json::from_value(json!({"id": "h"})).unwrap();
        assert!(!home.is_live_capable());
    }

    #[test]
    fn test_price_level_parsing() {
        let level: PriceLevel = serde_json::from_value(json!("VERY_CHEAP")).unwrap();
        assert_eq!(level, PriceLevel::VeryCheap);

        let level: PriceLevel = serde_json::from_value(json!("SOMETHING_NEW")).unwrap();
        assert_eq!(level, PriceLevel::Unknown);

        assert_eq!(PriceLevel::VeryExpensive.to_string(), "Very Expensive");
    }

    #[test]
    fn test_price_info_from_api_json() {
        let info: PriceInfo = serde_json::from_value(json!({
            "current": {
                "total": 1.25, "energy": 1.0, "tax": 0.25,
                "startsAt": "2024-03-01T12:00:00.000+01:00",
                "level": "NORMAL", "currency": "NOK"
            },
            "today": [{
                "total": 0.5, "energy": 0.4, "tax": 0.1,
                "startsAt": "2024-03-01T00:00:00.000+01:00",
                "level": "VERY_CHEAP", "currency": "NOK"
            }],
            "tomorrow": null
        }))
        .unwrap();

        let current = info.current.unwrap();
        assert_eq!(current.level, PriceLevel::Normal);
        assert_eq!(current.starts_at.offset().local_minus_utc(), 3600);
        assert_eq!(info.today.len(), 1);
        assert!(info.tomorrow.is_empty());
    }

    #[test]
    fn test_telemetry_serializes_camel_case() {
        let timestamp = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+01:00").unwrap();
        let mut record = TelemetryRecord::new(timestamp, 1234.0);
        record.current_l1 = Some(5.5);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["power"], 1234.0);
        assert_eq!(value["currentL1"], 5.5);
        assert!(value.get("voltagePhase1").is_none());

        let back: TelemetryRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_telemetry_phase_helpers() {
        let timestamp = DateTime::parse_from_rfc3339("2024-03-01T12:00:00+01:00").unwrap();
        let mut record = TelemetryRecord::new(timestamp, 0.0);
        assert_eq!(record.voltages(), None);
        assert_eq!(record.currents(), None);

        record.voltage_phase1 = Some(230.0);
        record.voltage_phase2 = Some(231.0);
        assert_eq!(record.voltages(), Some([230.0, 231.0, 0.0]));
    }
}
