/// External API clients module
mod feeds;
mod nasa;
mod openrouter;
mod weather;

pub use feeds::{HeavensAboveClient, MpcClient};
pub use nasa::NasaApodClient;
pub use openrouter::{ChatRequest, OpenRouterClient};
pub use weather::OpenWeatherClient;

use crate::domain::WeatherSnapshot;
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

/// HTTP client wrapper with common configuration
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("star-collector/1.0")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-2xx response into an error
pub(crate) fn ensure_success(source_name: &str, resp: Response) -> ApiResult<Response> {
    if !resp.status().is_success() {
        return Err(ApiError::UpstreamStatus {
            source_name: source_name.to_string(),
            status: resp.status().as_u16(),
        });
    }
    Ok(resp)
}

/// An upstream feed yielding raw, source-shaped records
#[async_trait]
pub trait EventFeed: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> ApiResult<Vec<Value>>;
}

/// Current conditions at a coordinate
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, lat: f64, lng: f64) -> ApiResult<WeatherSnapshot>;
}

/// Hosted text-generation model
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> ApiResult<String>;
}
