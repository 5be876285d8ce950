use super::{ensure_success, EventFeed, HttpClient};
use crate::domain::SOURCE_NASA;
use crate::errors::ApiResult;
use async_trait::async_trait;
use serde_json::Value;

/// NASA Astronomy Picture of the Day client
pub struct NasaApodClient {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl NasaApodClient {
    pub fn new(http_client: HttpClient, base_url: String, api_key: String) -> Self {
        Self {
            http_client,
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl EventFeed for NasaApodClient {
    fn name(&self) -> &'static str {
        SOURCE_NASA
    }

    async fn fetch(&self) -> ApiResult<Vec<Value>> {
        let mut req = self.http_client.get_client().get(&self.base_url);
        if !self.api_key.is_empty() {
            req = req.query(&[("api_key", &self.api_key)]);
        }

        let resp = ensure_success(self.name(), req.send().await?)?;
        let json: Value = resp.json().await?;
        Ok(apod_records(json))
    }
}

/// APOD answers with a single object, or an array when a date range is asked for
pub fn apod_records(json: Value) -> Vec<Value> {
    match json {
        Value::Array(items) => items,
        Value::Null => vec![],
        other => vec![other],
    }
}
