use super::{ensure_success, HttpClient, WeatherProvider};
use crate::domain::{LightPollution, WeatherSnapshot};
use crate::errors::ApiResult;
use crate::utils::num;
use async_trait::async_trait;
use serde_json::Value;

/// Urban centers treated as heavily light-polluted
const URBAN_AREAS: &[(f64, f64)] = &[
    (40.7128, -74.0060),  // New York
    (34.0522, -118.2437), // Los Angeles
    (41.8781, -87.6298),  // Chicago
];

/// Degrees of lat/lng distance counted as "inside" an urban area
const URBAN_RADIUS_DEG: f64 = 0.5;

/// OpenWeatherMap current conditions client
pub struct OpenWeatherClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(http_client: HttpClient, base_url: String, api_key: String) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, lat: f64, lng: f64) -> ApiResult<WeatherSnapshot> {
        let resp = self
            .http_client
            .get_client()
            .get(&self.base_url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lng.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let json: Value = ensure_success("weather", resp)?.json().await?;
        Ok(parse_weather(&json, lat, lng))
    }
}

/// Map an OpenWeatherMap payload onto a snapshot, defaulting absent fields
pub fn parse_weather(json: &Value, lat: f64, lng: f64) -> WeatherSnapshot {
    let condition = json["weather"][0]["main"]
        .as_str()
        .filter(|s| !s.is_empty())
        .unwrap_or("Clear")
        .to_string();

    WeatherSnapshot {
        condition,
        cloud_cover: num(&json["clouds"]["all"]).unwrap_or(0.0),
        humidity: num(&json["main"]["humidity"]).unwrap_or(50.0),
        visibility: num(&json["visibility"]).unwrap_or(10000.0),
        light_pollution: light_pollution_level(lat, lng),
    }
}

/// Static proximity check against a few known cities
pub fn light_pollution_level(lat: f64, lng: f64) -> LightPollution {
    let urban = URBAN_AREAS.iter().any(|(a_lat, a_lng)| {
        ((lat - a_lat).powi(2) + (lng - a_lng).powi(2)).sqrt() < URBAN_RADIUS_DEG
    });
    if urban {
        LightPollution::High
    } else {
        LightPollution::Medium
    }
}
