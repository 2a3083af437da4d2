//! Daily forecast aggregation and decoding.
//!
//! The provider returns forecast samples at sub-daily intervals (3-hourly for
//! OpenWeatherMap). These are folded into one [`DailyForecast`] per calendar day.

use serde::Deserialize;
use serde_json::Value;

use crate::types::{DailyForecast, WeatherRecord};

/// One raw forecast sample as the provider sends it.
#[derive(Debug, Deserialize)]
struct ForecastSample {
    dt_txt: String,
    main: SampleMain,
    weather: Vec<SampleWeather>,
}

#[derive(Debug, Deserialize)]
struct SampleMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct SampleWeather {
    main: String,
    description: String,
}

#[derive(Debug, Default)]
struct DayGroup<'a> {
    temps: Vec<f64>,
    conditions: Vec<&'a str>,
    descriptions: Vec<&'a str>,
}

/// Fold raw forecast samples into one summary per date.
///
/// Dates appear in the order they are first seen. If any sample is missing a
/// field the whole result is empty; a partial forecast is never returned.
pub fn aggregate_daily(samples: &[Value]) -> Vec<DailyForecast> {
    let parsed = match parse_samples(samples) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!("Error processing forecast data: {}", e);
            return Vec::new();
        }
    };

    let mut days: Vec<(&str, DayGroup)> = Vec::new();
    for (sample, weather) in &parsed {
        let date = date_part(&sample.dt_txt);
        let index = match days.iter().position(|(d, _)| *d == date) {
            Some(index) => index,
            None => {
                days.push((date, DayGroup::default()));
                days.len() - 1
            }
        };

        let group = &mut days[index].1;
        group.temps.push(sample.main.temp);
        group.conditions.push(&weather.main);
        group.descriptions.push(&weather.description);
    }

    days.into_iter()
        .map(|(date, group)| DailyForecast {
            date: date.to_string(),
            temperature: round_to_tenth(mean(&group.temps)),
            condition: stable_mode(&group.conditions).unwrap_or("Unknown").to_string(),
            description: stable_mode(&group.descriptions).unwrap_or_default().to_string(),
        })
        .collect()
}

/// Decode the forecast stored on a record.
///
/// A missing record, empty text or malformed JSON all yield an empty list.
pub fn extract_forecast(record: Option<&WeatherRecord>) -> Vec<DailyForecast> {
    let Some(record) = record else {
        return Vec::new();
    };

    if record.forecast.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str(&record.forecast) {
        Ok(days) => days,
        Err(e) => {
            tracing::error!("Error decoding forecast JSON for {}: {}", record.location, e);
            Vec::new()
        }
    }
}

/// Round to one decimal place; halves of the scaled value round away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn parse_samples(
    samples: &[Value],
) -> Result<Vec<(ForecastSample, SampleWeather)>, String> {
    samples
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let mut sample = ForecastSample::deserialize(raw)
                .map_err(|e| format!("sample {}: {}", i, e))?;
            if sample.weather.is_empty() {
                return Err(format!("sample {}: empty weather list", i));
            }
            let primary = sample.weather.swap_remove(0);
            Ok((sample, primary))
        })
        .collect()
}

/// Date component of a provider timestamp ("2023-01-01 12:00:00" -> "2023-01-01").
fn date_part(timestamp: &str) -> &str {
    timestamp
        .split([' ', 'T'])
        .next()
        .unwrap_or(timestamp)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Most frequent value; on a tie the value seen first wins.
fn stable_mode<'a>(values: &[&'a str]) -> Option<&'a str> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for value in values {
        match counts.iter().position(|(v, _)| v == value) {
            Some(index) => counts[index].1 += 1,
            None => counts.push((*value, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use serde_json::json;

    fn sample(dt_txt: &str, temp: f64, main: &str, description: &str) -> Value {
        json!({
            "dt_txt": dt_txt,
            "main": {"temp": temp},
            "weather": [{"main": main, "description": description}]
        })
    }

    #[test]
    fn test_two_days_aggregate_independently() {
        let samples = vec![
            sample("2023-01-01 00:00:00", 20.0, "Clear", "clear sky"),
            sample("2023-01-01 03:00:00", 18.0, "Clear", "clear sky"),
            sample("2023-01-02 00:00:00", 22.0, "Clouds", "scattered clouds"),
        ];

        let days = aggregate_daily(&samples);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2023-01-01");
        assert_eq!(days[0].temperature, 19.0);
        assert_eq!(days[0].condition, "Clear");
        assert_eq!(days[0].description, "clear sky");
        assert_eq!(days[1].date, "2023-01-02");
        assert_eq!(days[1].temperature, 22.0);
        assert_eq!(days[1].condition, "Clouds");
    }

    #[test]
    fn test_mean_is_rounded_to_one_decimal() {
        let samples = vec![
            sample("2024-03-10 00:00:00", 10.0, "Rain", "light rain"),
            sample("2024-03-10 03:00:00", 10.1, "Rain", "light rain"),
            sample("2024-03-10 06:00:00", 10.5, "Rain", "light rain"),
        ];

        let days = aggregate_daily(&samples);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].temperature, 10.2);
    }

    #[test]
    fn test_mode_tie_keeps_first_seen() {
        let samples = vec![
            sample("2024-03-10 00:00:00", 5.0, "Snow", "light snow"),
            sample("2024-03-10 03:00:00", 5.0, "Snow", "light snow"),
            sample("2024-03-10 06:00:00", 5.0, "Clouds", "overcast clouds"),
            sample("2024-03-10 09:00:00", 5.0, "Clouds", "overcast clouds"),
        ];

        let days = aggregate_daily(&samples);
        assert_eq!(days[0].condition, "Snow");
        assert_eq!(days[0].description, "light snow");
    }

    #[test]
    fn test_majority_beats_first_seen() {
        let samples = vec![
            sample("2024-03-10 00:00:00", 5.0, "Clear", "clear sky"),
            sample("2024-03-10 03:00:00", 5.0, "Rain", "moderate rain"),
            sample("2024-03-10 06:00:00", 5.0, "Rain", "light rain"),
        ];

        let days = aggregate_daily(&samples);
        assert_eq!(days[0].condition, "Rain");
        assert_eq!(days[0].description, "clear sky");
    }

    #[test]
    fn test_dates_keep_first_seen_order() {
        let samples = vec![
            sample("2024-03-12 00:00:00", 1.0, "Clear", "clear sky"),
            sample("2024-03-10 00:00:00", 2.0, "Clear", "clear sky"),
            sample("2024-03-12 03:00:00", 3.0, "Clear", "clear sky"),
        ];

        let days = aggregate_daily(&samples);
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-12", "2024-03-10"]);
        assert_eq!(days[0].temperature, 2.0);
    }

    #[test]
    fn test_iso_timestamps_group_by_date() {
        let samples = vec![
            sample("2024-03-10T00:00:00", 4.0, "Clear", "clear sky"),
            sample("2024-03-10 21:00:00", 6.0, "Clear", "clear sky"),
        ];

        let days = aggregate_daily(&samples);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].temperature, 5.0);
    }

    #[test]
    fn test_missing_field_yields_empty_result() {
        let samples = vec![
            sample("2024-03-10 00:00:00", 4.0, "Clear", "clear sky"),
            json!({"dt_txt": "2024-03-10 03:00:00", "weather": [{"main": "Clear", "description": "x"}]}),
        ];

        assert!(aggregate_daily(&samples).is_empty());
    }

    #[test]
    fn test_empty_weather_list_yields_empty_result() {
        let samples = vec![json!({
            "dt_txt": "2024-03-10 00:00:00",
            "main": {"temp": 4.0},
            "weather": []
        })];

        assert!(aggregate_daily(&samples).is_empty());
    }

    #[test]
    fn test_no_samples() {
        assert!(aggregate_daily(&[]).is_empty());
    }

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(19.04), 19.0);
        assert_eq!(round_to_tenth(19.06), 19.1);
        assert_eq!(round_to_tenth(-3.26), -3.3);
    }

    #[test]
    fn test_round_to_tenth_halves_away_from_zero() {
        assert_eq!(round_to_tenth(0.25), 0.3);
        assert_eq!(round_to_tenth(-0.25), -0.3);
        assert_eq!(round_to_tenth(20.15), 20.2);
    }

    fn record_with_forecast(text: &str) -> WeatherRecord {
        let mut record = WeatherRecord::new("Berlin", 20.0, "Clear", &[]).unwrap();
        record.forecast = text.to_string();
        record
    }

    #[test]
    fn test_extract_forecast() {
        let record = record_with_forecast(
            r#"[{"date":"2023-01-01","temperature":20.0,"condition":"Clear","description":"clear sky"},
                {"date":"2023-01-02","temperature":22.0,"condition":"Clouds","description":"scattered clouds"}]"#,
        );

        let days = extract_forecast(Some(&record));
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2023-01-01");
        assert_eq!(days[0].temperature, 20.0);
        assert_eq!(days[1].condition, "Clouds");
    }

    #[test]
    fn test_extract_forecast_tolerates_bad_input() {
        assert!(extract_forecast(None).is_empty());
        assert!(extract_forecast(Some(&record_with_forecast(""))).is_empty());
        assert!(extract_forecast(Some(&record_with_forecast("not-valid-json"))).is_empty());
        assert!(extract_forecast(Some(&record_with_forecast("{}"))).is_empty());
    }
}
