/// In-process stand-ins for upstream clients
use super::daily_update::Notifier;
use crate::clients::{ChatModel, ChatRequest, EventFeed, WeatherProvider};
use crate::domain::{DailyReport, WeatherSnapshot};
use crate::errors::{ApiError, ApiResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct StaticFeed {
    pub name: &'static str,
    pub records: Vec<Value>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StaticFeed {
    pub fn new(name: &'static str, records: Vec<Value>) -> Self {
        Self {
            name,
            records,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventFeed for StaticFeed {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self) -> ApiResult<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.records.clone())
    }
}

pub struct FailingFeed(pub &'static str);

#[async_trait]
impl EventFeed for FailingFeed {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn fetch(&self) -> ApiResult<Vec<Value>> {
        Err(ApiError::UpstreamStatus {
            source_name: self.0.to_string(),
            status: 503,
        })
    }
}

pub struct StaticWeather {
    pub snapshot: Option<WeatherSnapshot>,
    pub delay: Option<Duration>,
}

impl StaticWeather {
    pub fn ok(snapshot: WeatherSnapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            snapshot: None,
            delay: None,
        }
    }
}

#[async_trait]
impl WeatherProvider for StaticWeather {
    async fn current(&self, _lat: f64, _lng: f64) -> ApiResult<WeatherSnapshot> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.snapshot
            .clone()
            .ok_or_else(|| ApiError::Internal("weather down".into()))
    }
}

/// Replies with a fixed completion and records every prompt it saw
pub struct ScriptedModel {
    pub reply: ApiResult<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err(ApiError::Internal("model down".into())),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> ApiResult<String> {
        self.prompts.lock().push(request.prompt);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(ApiError::Internal(e.to_string())),
        }
    }
}

/// Records recipients; fails for addresses containing "bounce"
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &str, _report: &DailyReport) -> ApiResult<()> {
        if recipient.contains("bounce") {
            return Err(ApiError::Internal("mailbox full".into()));
        }
        self.sent.lock().push(recipient.to_string());
        Ok(())
    }
}
