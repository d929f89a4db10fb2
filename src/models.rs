//! Data models for readings and alerts, plus the collector's wire shapes.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---

/// One timestamped temperature/humidity sample.
///
/// Values are raw sensor output and are not bounds-checked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

/// Display severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

impl Severity {
    /// Map the collector's severity vocabulary onto display severities.
    ///
    /// `"error"` is shown as danger, `"warning"` as warning, anything else as info.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "error" => Severity::Danger,
            "warning" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// A notification describing an abnormal sensor condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    // ---
    pub id: u64,
    pub alert_type: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

/// A classified alert that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertNotice {
    // ---
    pub alert_type: Option<String>,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
}

impl AlertNotice {
    pub fn into_alert(self, id: u64) -> Alert {
        // ---
        Alert {
            id,
            alert_type: self.alert_type,
            message: self.message,
            severity: self.severity,
            timestamp: self.timestamp,
            temperature: self.temperature,
            humidity: self.humidity,
        }
    }
}

// --- wire shapes

/// Raw reading row as served by `/api/sensor/readings` and `/api/sensor/latest`.
#[derive(Debug, Deserialize)]
pub struct RawSensorReading {
    // ---
    #[serde(default)]
    pub id: Option<i64>,
    pub temp: f64,
    pub humidity: f64,
    #[serde(deserialize_with = "lenient_utc")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl RawSensorReading {
    pub fn to_reading(&self) -> Reading {
        // ---
        Reading {
            timestamp: self.timestamp,
            temperature: self.temp,
            humidity: self.humidity,
        }
    }
}

/// `{status, data}` envelope wrapped around every collector response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    // ---
    pub status: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Sensor values attached to a streamed alert.
#[derive(Debug, Deserialize)]
pub struct SensorValues {
    // ---
    pub temp: f64,
    pub humidity: f64,
}

/// Body of a streamed `alert` frame.
#[derive(Debug, Deserialize)]
pub struct AlertPayload {
    // ---
    #[serde(default)]
    pub alert_type: Option<String>,
    pub severity: String,
    pub message: String,
    #[serde(deserialize_with = "lenient_utc")]
    pub timestamp: DateTime<Utc>,
    pub sensor_data: SensorValues,
}

/// Body of a streamed `reading` frame.
#[derive(Debug, Deserialize)]
pub struct LiveReadingPayload {
    // ---
    pub temp: f64,
    pub humidity: f64,
    #[serde(deserialize_with = "lenient_utc")]
    pub timestamp: DateTime<Utc>,
}

/// Tagged streaming frame, discriminated by its `type` field.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    Alert { data: AlertPayload },
    Reading { data: LiveReadingPayload },
}

/// Parse a collector timestamp.
///
/// Accepts RFC 3339 (`2025-03-26T18:45:00.123Z`) as well as the naive forms
/// the collector's SQLite store writes, which are taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    // ---
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{raw}'")))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_severity_mapping() {
        // ---
        assert_eq!(Severity::from_wire("error"), Severity::Danger);
        assert_eq!(Severity::from_wire("warning"), Severity::Warning);
        assert_eq!(Severity::from_wire("info"), Severity::Info);
        assert_eq!(Severity::from_wire("critical"), Severity::Info);
        assert_eq!(Severity::from_wire(""), Severity::Info);
    }

    #[test]
    fn test_timestamp_forms() {
        // ---
        let expected = Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap();

        assert_eq!(parse_timestamp("2025-03-26T18:45:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-26T20:45:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-26T18:45:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-26 18:45:00"), Some(expected));

        let fractional = parse_timestamp("2025-03-26T18:45:00.250000Z").unwrap();
        assert_eq!(fractional.nanosecond(), 250_000_000);

        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_raw_reading_conversion() {
        // ---
        let raw: RawSensorReading = serde_json::from_str(
            r#"{"id": 7, "temp": 22.4, "humidity": 51.0,
                "timestamp": "2025-03-26T18:45:00Z", "created_at": "2025-03-26 18:45:01"}"#,
        )
        .unwrap();

        let reading = raw.to_reading();
        assert_eq!(reading.temperature, 22.4);
        assert_eq!(reading.humidity, 51.0);
        assert_eq!(reading.timestamp.hour(), 18);
    }

    #[test]
    fn test_envelope_without_data() {
        // ---
        let env: Envelope<Vec<RawSensorReading>> =
            serde_json::from_str(r#"{"status": "error"}"#).unwrap();
        assert!(!env.is_success());
        assert!(env.data.is_none());
    }

    #[test]
    fn test_alert_serializes_lowercase_severity() {
        // ---
        let alert = AlertNotice {
            alert_type: Some("high_temperature".to_string()),
            message: "High temp".to_string(),
            severity: Severity::Danger,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            temperature: 31.2,
            humidity: 60.0,
        }
        .into_alert(4);

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["id"], 4);
        assert_eq!(json["severity"], "danger");
    }
}
