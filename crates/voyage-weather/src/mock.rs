//! Generated weather used when the provider is unconfigured or unreachable.

use chrono::{Days, NaiveDate};
use rand::Rng;

use crate::forecast::round_to_tenth;
use crate::types::{DailyForecast, WeatherRecord};

/// Condition labels the generator draws from.
pub const MOCK_CONDITIONS: [&str; 5] = ["Clear", "Clouds", "Rain", "Sunny", "Partly Cloudy"];

/// Number of forecast days in a generated record.
pub const MOCK_FORECAST_DAYS: u64 = 5;

/// Build a plausible random record for `location` with a forecast starting at `today`.
///
/// The record is shaped exactly like a provider-sourced one; pass a seeded RNG
/// to get reproducible output.
pub fn mock_record<R: Rng + ?Sized>(
    location: &str,
    rng: &mut R,
    today: NaiveDate,
) -> Result<WeatherRecord, serde_json::Error> {
    let condition = pick_condition(rng);
    let temperature = round_to_tenth(rng.gen_range(10.0..=30.0));

    let forecast: Vec<DailyForecast> = (0..MOCK_FORECAST_DAYS)
        .map(|offset| {
            let date = today.checked_add_days(Days::new(offset)).unwrap_or(today);
            let variation = round_to_tenth(rng.gen_range(-5.0..=5.0));
            let day_condition = pick_condition(rng);
            DailyForecast {
                date: date.format("%Y-%m-%d").to_string(),
                temperature: round_to_tenth(temperature + variation),
                condition: day_condition.to_string(),
                description: day_condition.to_lowercase(),
            }
        })
        .collect();

    WeatherRecord::new(location, temperature, condition, &forecast)
}

fn pick_condition<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    MOCK_CONDITIONS[rng.gen_range(0..MOCK_CONDITIONS.len())]
}
