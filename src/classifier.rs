//! Decoder for inbound stream frames.
//!
//! Malformed input is data, not a fault: anything that does not validate
//! comes back as [`Inbound::Unknown`] and the caller drops it.

use crate::{AlertNotice, Reading, Severity, StreamFrame};

/// Result of classifying one inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Alert(AlertNotice),
    Reading(Reading),
    /// Not a frame we understand; carries the reason for logging.
    Unknown(String),
}

/// Classify a raw stream payload.
pub fn classify(raw: &str) -> Inbound {
    // ---
    match serde_json::from_str::<StreamFrame>(raw) {
        Ok(StreamFrame::Alert { data }) => Inbound::Alert(AlertNotice {
            severity: Severity::from_wire(&data.severity),
            alert_type: data.alert_type,
            message: data.message,
            timestamp: data.timestamp,
            temperature: data.sensor_data.temp,
            humidity: data.sensor_data.humidity,
        }),
        Ok(StreamFrame::Reading { data }) => Inbound::Reading(Reading {
            timestamp: data.timestamp,
            temperature: data.temp,
            humidity: data.humidity,
        }),
        Err(e) => Inbound::Unknown(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::{TimeZone, Utc};

    fn alert_frame(severity: &str) -> String {
        format!(
            r#"{{"type":"alert","data":{{"alert_type":"high_temperature","severity":"{severity}",
                "message":"High temp","timestamp":"2025-03-26T18:45:00Z",
                "sensor_data":{{"temp":31.2,"humidity":60}}}},
                "broadcast_time":"2025-03-26T18:45:01Z"}}"#
        )
    }

    #[test]
    fn test_error_severity_becomes_danger() {
        // ---
        let Inbound::Alert(notice) = classify(&alert_frame("error")) else {
            panic!("expected an alert");
        };
        assert_eq!(notice.message, "High temp");
        assert_eq!(notice.severity, Severity::Danger);
        assert_eq!(notice.alert_type.as_deref(), Some("high_temperature"));
        assert_eq!(notice.temperature, 31.2);
        assert_eq!(notice.humidity, 60.0);
        assert_eq!(
            notice.timestamp,
            Utc.with_ymd_and_hms(2025, 3, 26, 18, 45, 0).unwrap()
        );
    }

    #[test]
    fn test_other_severities() {
        // ---
        let severity = |s: &str| match classify(&alert_frame(s)) {
            Inbound::Alert(notice) => notice.severity,
            other => panic!("expected an alert, got {other:?}"),
        };
        assert_eq!(severity("warning"), Severity::Warning);
        assert_eq!(severity("info"), Severity::Info);
        assert_eq!(severity("whatever"), Severity::Info);
    }

    #[test]
    fn test_alert_type_is_optional() {
        // ---
        let raw = r#"{"type":"alert","data":{"severity":"warning","message":"Dry",
            "timestamp":"2025-03-26T18:45:00Z","sensor_data":{"temp":25,"humidity":29}}}"#;
        let Inbound::Alert(notice) = classify(raw) else {
            panic!("expected an alert");
        };
        assert_eq!(notice.alert_type, None);
    }

    #[test]
    fn test_missing_fields_are_unknown() {
        // ---
        let no_message = r#"{"type":"alert","data":{"severity":"error",
            "timestamp":"2025-03-26T18:45:00Z","sensor_data":{"temp":31.2,"humidity":60}}}"#;
        let no_sensor_data = r#"{"type":"alert","data":{"severity":"error","message":"x",
            "timestamp":"2025-03-26T18:45:00Z"}}"#;
        let no_data = r#"{"type":"alert"}"#;
        let bad_timestamp = r#"{"type":"alert","data":{"severity":"error","message":"x",
            "timestamp":"soon","sensor_data":{"temp":31.2,"humidity":60}}}"#;

        for raw in [no_message, no_sensor_data, no_data, bad_timestamp] {
            assert!(matches!(classify(raw), Inbound::Unknown(_)), "{raw}");
        }
    }

    #[test]
    fn test_garbage_is_unknown() {
        // ---
        for raw in ["", "not json", "[]", "42", r#"{"type":"ping"}"#, r#"{"data":{}}"#] {
            assert!(matches!(classify(raw), Inbound::Unknown(_)), "{raw}");
        }
    }

    #[test]
    fn test_reading_frame() {
        // ---
        let raw = r#"{"type":"reading","data":{"temp":24.5,"humidity":48.0,
            "timestamp":"2025-03-26T18:46:00Z"}}"#;
        assert_eq!(
            classify(raw),
            Inbound::Reading(Reading {
                timestamp: Utc.with_ymd_and_hms(2025, 3, 26, 18, 46, 0).unwrap(),
                temperature: 24.5,
                humidity: 48.0,
            })
        );
    }
}
