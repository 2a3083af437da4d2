//! Integration tests for WeatherService using wiremock and a file-backed store.

use std::sync::Arc;

use voyage_core::{AppError, WeatherConfig};
use voyage_weather::{
    extract_forecast, SqliteWeatherStore, WeatherError, WeatherProvider, WeatherService,
    WeatherStore,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample(dt_txt: &str, temp: f64, main: &str, description: &str) -> serde_json::Value {
    serde_json::json!({
        "dt_txt": dt_txt,
        "main": {"temp": temp},
        "weather": [{"main": main, "description": description}]
    })
}

fn config(base_url: &str, access_key: &str) -> WeatherConfig {
    WeatherConfig {
        access_key: access_key.to_string(),
        base_url: base_url.to_string(),
        ..WeatherConfig::default()
    }
}

#[tokio::test]
async fn test_resolve_fetches_once_then_serves_cache() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": {"temp": 16.2},
            "weather": [{"main": "Rain", "description": "light rain"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "list": [
                sample("2024-05-01 09:00:00", 14.0, "Rain", "light rain"),
                sample("2024-05-01 12:00:00", 17.0, "Clouds", "few clouds"),
                sample("2024-05-01 15:00:00", 18.0, "Rain", "moderate rain"),
                sample("2024-05-02 00:00:00", 11.0, "Clear", "clear sky"),
                sample("2024-05-02 03:00:00", 10.0, "Clear", "clear sky"),
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteWeatherStore::open(dir.path().join("weather.db")).unwrap());
    let service = WeatherService::new(config(&mock_server.uri(), "integration-key"), store.clone())
        .unwrap();

    let first = service.resolve_weather("Paris").await.unwrap();
    assert_eq!(first.temperature, 16.2);
    assert_eq!(first.conditions, "Rain");

    let days = extract_forecast(Some(&first));
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, "2024-05-01");
    assert_eq!(days[0].temperature, 16.3);
    assert_eq!(days[0].condition, "Rain");
    assert_eq!(days[0].description, "light rain");
    assert_eq!(days[1].date, "2024-05-02");
    assert_eq!(days[1].temperature, 10.5);

    let second = service.resolve_weather("Paris").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn test_unconfigured_key_serves_mock_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteWeatherStore::open(dir.path().join("weather.db")).unwrap());
    let service =
        WeatherService::new(config("http://127.0.0.1:1", "your_weather_api_key"), store.clone())
            .unwrap();

    let record = service.resolve_weather("Reykjavik").await.unwrap();
    assert_eq!(record.location, "Reykjavik");
    assert_eq!(extract_forecast(Some(&record)).len(), 5);

    // Second lookup is a cache hit, not another generated record.
    let again = service.resolve_weather("Reykjavik").await.unwrap();
    assert_eq!(again.id, record.id);
    assert_eq!(store.distinct_locations().unwrap(), vec!["Reykjavik"]);
}

#[tokio::test]
async fn test_provider_errors_map_to_app_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let store = Arc::new(SqliteWeatherStore::in_memory().unwrap());
    let provider = WeatherProvider::new(config(&mock_server.uri(), "integration-key"), store)
        .unwrap();

    let err = provider.fetch("Tokyo").await.unwrap_err();
    assert!(matches!(err, WeatherError::Provider(_)));

    let app: AppError = err.into();
    assert!(app.user_message().contains("Too many requests"));
}
