//! Open-Meteo client: forward geocoding followed by current conditions.
//! Free, no API key required.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use skycast_core::WeatherConfig;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::types::{CurrentWeather, GeocodeResult, WeatherError};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,weather_code,wind_speed_10m,is_day";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodeResult>>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: Option<ForecastCurrent>,
}

#[derive(Debug, Deserialize)]
struct ForecastCurrent {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    apparent_temperature: f64,
    weather_code: i32,
    wind_speed_10m: f64,
    is_day: u8,
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
    language: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            geocoding_url: config.geocoding_url.clone(),
            forecast_url: config.forecast_url.clone(),
            language: config.language.clone(),
        })
    }

    /// Geocode `city_name` and fetch its current conditions.
    ///
    /// The returned `city` is the geocoded name, which normalizes spelling
    /// and capitalization for cache and recents keys.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_current(&self, city_name: &str) -> Result<CurrentWeather, WeatherError> {
        let place = self.geocode(city_name).await?;
        tracing::debug!(
            "Resolved {:?} to {} ({}, {})",
            city_name,
            place.name,
            place.latitude,
            place.longitude
        );
        self.forecast(&place).await
    }

    /// Resolve a city name to its first geocoding match.
    #[instrument(skip(self), level = "debug")]
    pub async fn geocode(&self, city_name: &str) -> Result<GeocodeResult, WeatherError> {
        let name = city_name.trim();
        if name.is_empty() {
            return Err(WeatherError::InvalidInput);
        }

        let url = Url::parse_with_params(
            &self.geocoding_url,
            &[
                ("name", name),
                ("count", "1"),
                ("language", self.language.as_str()),
                ("format", "json"),
            ],
        )
        .map_err(|e| WeatherError::Network(format!("invalid geocoding URL: {}", e)))?;

        let response = self.client.get(url).send().await?;
        let body: GeocodingResponse = handle_response(response, "Geocoding").await?;

        body.results
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| WeatherError::CityNotFound(name.to_string()))
    }

    /// Fetch current conditions at a geocoded place.
    #[instrument(skip(self, place), fields(city = %place.name), level = "debug")]
    pub async fn forecast(&self, place: &GeocodeResult) -> Result<CurrentWeather, WeatherError> {
        let latitude = place.latitude.to_string();
        let longitude = place.longitude.to_string();

        let url = Url::parse_with_params(
            &self.forecast_url,
            &[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", CURRENT_FIELDS),
                ("timezone", "auto"),
            ],
        )
        .map_err(|e| WeatherError::Network(format!("invalid forecast URL: {}", e)))?;

        let response = self.client.get(url).send().await?;
        let body: ForecastResponse = handle_response(response, "Forecast").await?;

        let current = body
            .current
            .ok_or_else(|| WeatherError::Network("No current weather data".to_string()))?;

        Ok(CurrentWeather {
            city: place.name.clone(),
            condition_code: current.weather_code,
            temperature_c: current.temperature_2m,
            humidity_pct: current.relative_humidity_2m,
            wind_speed: current.wind_speed_10m,
            feels_like_c: current.apparent_temperature,
            is_day: current.is_day != 0,
        })
    }
}

/// Any non-2xx status or undecodable body is a network failure.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    step: &str,
) -> Result<T, WeatherError> {
    let status = response.status();
    if !status.is_success() {
        return Err(WeatherError::Network(format!("{} failed: HTTP {}", step, status)));
    }

    response.json().await.map_err(|e| {
        if e.is_decode() {
            WeatherError::Network(format!("{} returned malformed data: {}", step, e))
        } else {
            WeatherError::from(e)
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout_secs: u64) -> WeatherClient {
        let config = WeatherConfig {
            geocoding_url: format!("{}/v1/search", server.uri()),
            forecast_url: format!("{}/v1/forecast", server.uri()),
            request_timeout_secs: timeout_secs,
            ..WeatherConfig::default()
        };
        WeatherClient::new(&config).unwrap()
    }

    fn forecast_body(temperature: f64, code: i32, is_day: u8) -> serde_json::Value {
        serde_json::json!({
            "current": {
                "temperature_2m": temperature,
                "relative_humidity_2m": 71,
                "apparent_temperature": 12.6,
                "weather_code": code,
                "wind_speed_10m": 9.4,
                "is_day": is_day
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_current_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .and(query_param("name", "london"))
            .and(query_param("count", "1"))
            .and(query_param("language", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"id": 2643743, "name": "London", "latitude": 51.5, "longitude": -0.12, "country": "United Kingdom", "admin1": "England"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "51.5"))
            .and(query_param("longitude", "-0.12"))
            .and(query_param("timezone", "auto"))
            .and(query_param("current", CURRENT_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(14.2, 2, 1)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 10);
        let weather = client.fetch_current("  london ").await.unwrap();

        // Canonical name comes from geocoding, not the raw input
        assert_eq!(weather.city, "London");
        assert_eq!(weather.condition_code, 2);
        assert!((weather.temperature_c - 14.2).abs() < f64::EPSILON);
        assert!((weather.wind_speed - 9.4).abs() < f64::EPSILON);
        assert!(weather.is_day);
    }

    #[tokio::test]
    async fn test_geocode_keeps_country_and_region() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"name": "Paris", "latitude": 48.85, "longitude": 2.35, "country": "France", "admin1": "Île-de-France"},
                    {"name": "Paris", "latitude": 33.66, "longitude": -95.55, "country": "United States"}
                ]
            })))
            .mount(&server)
            .await;

        let place = client_for(&server, 10).geocode("Paris").await.unwrap();
        assert_eq!(place.country.as_deref(), Some("France"));
        assert_eq!(place.admin1.as_deref(), Some("Île-de-France"));
        assert!((place.latitude - 48.85).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_city_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "generationtime_ms": 0.5
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(1.0, 0, 1)))
            .expect(0)
            .mount(&server)
            .await;

        let result = client_for(&server, 10).fetch_current("Zzzzznotacity").await;
        assert_eq!(result, Err(WeatherError::CityNotFound("Zzzzznotacity".to_string())));
    }

    #[tokio::test]
    async fn test_empty_results_array_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
            )
            .mount(&server)
            .await;

        let result = client_for(&server, 10).geocode("Nowhere").await;
        assert!(matches!(result, Err(WeatherError::CityNotFound(_))));
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client_for(&server, 10).fetch_current("   ").await;
        assert_eq!(result, Err(WeatherError::InvalidInput));
    }

    #[tokio::test]
    async fn test_geocoding_server_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server, 10).fetch_current("London").await;
        match result {
            Err(WeatherError::Network(msg)) => assert!(msg.contains("500"), "{}", msg),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_current_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"name": "London", "latitude": 51.5, "longitude": -0.12}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "latitude": 51.5 })),
            )
            .mount(&server)
            .await;

        let result = client_for(&server, 10).fetch_current("London").await;
        assert_eq!(
            result,
            Err(WeatherError::Network("No current weather data".to_string()))
        );
    }

    #[tokio::test]
    async fn test_malformed_forecast_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"name": "London", "latitude": 51.5, "longitude": -0.12}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server, 10).fetch_current("London").await;
        assert!(result.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "results": [] }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let result = client_for(&server, 1).fetch_current("London").await;
        assert_eq!(result, Err(WeatherError::Network("request timed out".to_string())));
    }
}
