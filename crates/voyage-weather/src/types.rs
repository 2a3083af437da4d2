use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One cached weather lookup for a location.
///
/// Records are written once and never updated; newer lookups for the same
/// location supersede older ones by `retrieved_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: Uuid,
    /// Free-text location as the provider matched it (e.g. "Paris")
    pub location: String,
    /// Current temperature in Celsius
    pub temperature: f64,
    /// Short condition label, e.g. "Clear" or "Rain"
    pub conditions: String,
    /// Daily forecast serialized as JSON text; read it with [`crate::extract_forecast`]
    pub forecast: String,
    pub retrieved_at: DateTime<Utc>,
}

impl WeatherRecord {
    /// Build a fresh record stamped with the current time.
    pub fn new(
        location: &str,
        temperature: f64,
        conditions: &str,
        forecast: &[DailyForecast],
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            location: location.to_string(),
            temperature,
            conditions: conditions.to_string(),
            forecast: serde_json::to_string(forecast)?,
            retrieved_at: now_micros(),
        })
    }
}

impl std::fmt::Display for WeatherRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} ({:.1}°C) at {}",
            self.location,
            self.conditions,
            self.temperature,
            self.retrieved_at.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Summary of one calendar day of forecast samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    /// Mean temperature in Celsius, one decimal
    pub temperature: f64,
    pub condition: String,
    #[serde(default)]
    pub description: String,
}

/// Current time truncated to the store's microsecond precision.
pub(crate) fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    from_micros(now.timestamp_micros()).unwrap_or(now)
}

pub(crate) fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
    DateTime::from_timestamp(secs, nanos)
}

/// Icon class for a condition label (Bootstrap Icons names).
///
/// Matching is case-insensitive and by substring, so "Light Rain" maps like "Rain".
pub fn condition_icon(condition: &str) -> &'static str {
    const ICONS: &[(&str, &str)] = &[
        ("clear", "bi-sun"),
        ("clouds", "bi-cloud"),
        ("rain", "bi-cloud-rain"),
        ("drizzle", "bi-cloud-drizzle"),
        ("thunderstorm", "bi-cloud-lightning"),
        ("snow", "bi-snow"),
        ("mist", "bi-cloud-fog"),
        ("smoke", "bi-cloud-haze"),
        ("haze", "bi-cloud-haze"),
        ("dust", "bi-cloud-haze"),
        ("fog", "bi-cloud-fog"),
        ("sand", "bi-cloud-haze"),
        ("ash", "bi-cloud-haze"),
        ("squall", "bi-cloud-lightning-rain"),
        ("tornado", "bi-tornado"),
    ];
    lookup(ICONS, condition).unwrap_or("bi-cloud")
}

/// Text colour class for a condition label.
pub fn condition_color(condition: &str) -> &'static str {
    const COLORS: &[(&str, &str)] = &[
        ("clear", "text-warning"),
        ("clouds", "text-secondary"),
        ("rain", "text-primary"),
        ("drizzle", "text-info"),
        ("thunderstorm", "text-danger"),
        ("snow", "text-info"),
        ("mist", "text-secondary"),
        ("smoke", "text-secondary"),
        ("haze", "text-secondary"),
        ("dust", "text-secondary"),
        ("fog", "text-secondary"),
        ("sand", "text-warning"),
        ("ash", "text-secondary"),
        ("squall", "text-primary"),
        ("tornado", "text-danger"),
    ];
    lookup(COLORS, condition).unwrap_or("text-secondary")
}

fn lookup(table: &[(&str, &'static str)], condition: &str) -> Option<&'static str> {
    let condition = condition.to_lowercase();
    table
        .iter()
        .find(|(key, _)| condition.contains(key))
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_display() {
        let mut record = WeatherRecord::new("Berlin", 15.0, "Cloudy", &[]).unwrap();
        record.retrieved_at = Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 0).unwrap();

        let shown = record.to_string();
        assert_eq!(shown, "Berlin - Cloudy (15.0°C) at 2024-06-01 14:30");
    }

    #[test]
    fn test_new_record_serializes_forecast() {
        let forecast = vec![DailyForecast {
            date: "2023-01-01".to_string(),
            temperature: 19.0,
            condition: "Sunny".to_string(),
            description: "sunny".to_string(),
        }];
        let record = WeatherRecord::new("London", 20.5, "Sunny", &forecast).unwrap();

        assert_eq!(record.location, "London");
        assert!(record.forecast.contains("Sunny"));
        assert!(record.forecast.starts_with('['));
    }

    #[test]
    fn test_record_serializes_id_as_uuid_string() {
        let record = WeatherRecord::new("Oslo", -2.5, "Snow", &[]).unwrap();

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], serde_json::Value::String(record.id.to_string()));

        let parsed: WeatherRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_new_records_get_distinct_ids() {
        let a = WeatherRecord::new("Oslo", 1.0, "Snow", &[]).unwrap();
        let b = WeatherRecord::new("Oslo", 1.0, "Snow", &[]).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_micros_round_trip() {
        let now = now_micros();
        assert_eq!(from_micros(now.timestamp_micros()), Some(now));

        let before_epoch = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(from_micros(before_epoch.timestamp_micros()), Some(before_epoch));
    }

    #[test]
    fn test_daily_forecast_description_defaults() {
        let day: DailyForecast =
            serde_json::from_str(r#"{"date":"2023-01-01","temperature":21.0,"condition":"Clear"}"#)
                .unwrap();
        assert_eq!(day.description, "");
    }

    #[test]
    fn test_condition_icon() {
        assert_eq!(condition_icon("Clear"), "bi-sun");
        assert_eq!(condition_icon("Light Rain"), "bi-cloud-rain");
        assert_eq!(condition_icon("TORNADO"), "bi-tornado");
        assert_eq!(condition_icon(""), "bi-cloud");
        assert_eq!(condition_icon("Unknown"), "bi-cloud");
    }

    #[test]
    fn test_condition_color() {
        assert_eq!(condition_color("Clear"), "text-warning");
        assert_eq!(condition_color("Thunderstorm"), "text-danger");
        assert_eq!(condition_color("Partly Cloudy"), "text-secondary");
    }
}
