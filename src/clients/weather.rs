//! Current weather for the trip's cities via OpenWeatherMap

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::WeatherConfig;
use crate::error::{GuideError, Service};

/// Shown whenever a reading cannot be produced
pub const WEATHER_UNAVAILABLE: &str = "Weather information is currently unavailable.";

/// Cities the weather widget offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum City {
    #[default]
    Taipei,
    Taichung,
    Tainan,
    Kaohsiung,
    Hualien,
}

impl City {
    pub const ALL: [City; 5] = [
        City::Taipei,
        City::Taichung,
        City::Tainan,
        City::Kaohsiung,
        City::Hualien,
    ];

    /// English name, as the weather backend expects it
    #[must_use]
    pub fn query_name(self) -> &'static str {
        match self {
            City::Taipei => "Taipei",
            City::Taichung => "Taichung",
            City::Tainan => "Tainan",
            City::Kaohsiung => "Kaohsiung",
            City::Hualien => "Hualien",
        }
    }

    #[must_use]
    pub fn korean_name(self) -> &'static str {
        match self {
            City::Taipei => "타이베이",
            City::Taichung => "타이중",
            City::Tainan => "타이난",
            City::Kaohsiung => "가오슝",
            City::Hualien => "화롄",
        }
    }

    /// Resolve a user-supplied name; anything unrecognised becomes the default city
    #[must_use]
    pub fn from_name(name: &str) -> City {
        let name = name.trim();
        City::ALL
            .into_iter()
            .find(|city| {
                city.query_name().eq_ignore_ascii_case(name) || city.korean_name() == name
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReading {
    pub temperature_c: f64,
    pub description: String,
}

impl WeatherReading {
    /// Format temperature with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.1}°C", self.temperature_c)
    }

    #[must_use]
    pub fn display(&self, city: City) -> String {
        format!(
            "{city}: {}, {}",
            self.description,
            self.format_temperature()
        )
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

impl From<CurrentWeatherResponse> for WeatherReading {
    fn from(response: CurrentWeatherResponse) -> Self {
        let description = response
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .unwrap_or_else(|| "unknown conditions".to_string());
        Self {
            temperature_c: response.main.temp,
            description,
        }
    }
}

#[derive(Clone)]
pub struct WeatherClient {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    language: String,
    timeout: Duration,
}

impl WeatherClient {
    pub fn new(http: Client, config: &WeatherConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            timeout: config.timeout(),
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch the current reading for a city
    #[instrument(skip(self), fields(city = %city))]
    pub async fn reading(&self, city: City) -> Result<WeatherReading, GuideError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GuideError::unconfigured(
                Service::Weather,
                "weather.api_key (or OPENWEATHER_API_KEY)",
            ));
        };

        let url = format!("{}/data/2.5/weather", self.base_url);
        let start = Instant::now();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", city.query_name()),
                ("units", "metric"),
                ("lang", self.language.as_str()),
                ("appid", api_key),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GuideError::from_transport(Service::Weather, &e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GuideError::from_status(
                Service::Weather,
                status,
                &format!("weather for {city}"),
                &text,
            ));
        }

        let parsed: CurrentWeatherResponse = response
            .json()
            .await
            .map_err(|e| GuideError::connection(Service::Weather, e.to_string()))?;

        info!("Weather retrieved in {:.3}s", start.elapsed().as_secs_f64());
        Ok(parsed.into())
    }

    /// Display string for the weather widget. Any failure degrades to
    /// [`WEATHER_UNAVAILABLE`].
    pub async fn current_weather(&self, city_name: &str) -> String {
        let city = City::from_name(city_name);
        match self.reading(city).await {
            Ok(reading) => reading.display(city),
            Err(err) => {
                warn!(kind = ?err.kind(), "Weather unavailable: {err}");
                WEATHER_UNAVAILABLE.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Taipei", City::Taipei)]
    #[case("  kaohsiung ", City::Kaohsiung)]
    #[case("HUALIEN", City::Hualien)]
    #[case("타이난", City::Tainan)]
    #[case("Tokyo", City::Taipei)]
    #[case("", City::Taipei)]
    fn test_city_resolution(#[case] name: &str, #[case] expected: City) {
        assert_eq!(City::from_name(name), expected);
    }

    #[test]
    fn test_reading_display() {
        let reading = WeatherReading {
            temperature_c: 23.456,
            description: "light rain".to_string(),
        };
        assert_eq!(reading.display(City::Tainan), "Tainan: light rain, 23.5°C");
    }

    #[test]
    fn test_parse_openweather_response() {
        let json = r#"{
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
            "main": {"temp": 28.04, "feels_like": 31.2, "humidity": 74},
            "name": "Taipei"
        }"#;
        let parsed: CurrentWeatherResponse = serde_json::from_str(json).unwrap();
        let reading = WeatherReading::from(parsed);
        assert_eq!(reading.format_temperature(), "28.0°C");
        assert_eq!(reading.description, "broken clouds");
    }

    #[tokio::test]
    async fn test_unconfigured_returns_placeholder() {
        let client = WeatherClient::new(Client::new(), &WeatherConfig::default());
        assert!(!client.is_configured());
        assert_eq!(client.current_weather("Taipei").await, WEATHER_UNAVAILABLE);
    }

    #[test]
    fn test_is_configured_with_key() {
        let config = WeatherConfig {
            api_key: Some("owm-key".to_string()),
            ..WeatherConfig::default()
        };
        assert!(WeatherClient::new(Client::new(), &config).is_configured());
    }
}
