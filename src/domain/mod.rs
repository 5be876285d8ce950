/// Domain models for the application
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on events returned in one snapshot
pub const MAX_EVENTS: usize = 5;

/// Provenance tags for snapshot events
pub const SOURCE_NASA: &str = "NASA APOD";
pub const SOURCE_HEAVENS_ABOVE: &str = "Heavens-Above";
pub const SOURCE_MPC: &str = "MPC";

pub const DEFAULT_LAT: f64 = 39.9042;
pub const DEFAULT_LNG: f64 = 116.4074;
pub const DEFAULT_CITY: &str = "New York";
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Planet,
    Meteor,
    Moon,
    Star,
    Comet,
    Eclipse,
    Satellite,
    Asteroid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPollution {
    Low,
    Medium,
    High,
}

/// Per-event advisory produced by the enrichment model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertAdvice {
    #[serde(default)]
    pub observation_tips: String,
    #[serde(default)]
    pub science_insight: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub safety_tips: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CelestialEvent {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub description: String,
    pub best_time: String,
    pub visibility: Visibility,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expert_advice: Option<ExpertAdvice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub condition: String,
    pub cloud_cover: f64,
    pub humidity: f64,
    /// Visibility in meters
    pub visibility: f64,
    pub light_pollution: LightPollution,
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self {
            condition: "Clear".to_string(),
            cloud_cover: 20.0,
            humidity: 50.0,
            visibility: 10000.0,
            light_pollution: LightPollution::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub lat: f64,
    pub lng: f64,
    pub timezone: String,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_string(),
            lat: DEFAULT_LAT,
            lng: DEFAULT_LNG,
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub total_events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_event: Option<CelestialEvent>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_summary: Option<String>,
}

/// Response envelope of the celestial snapshot endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub location: Location,
    pub date: DateTime<Utc>,
    pub events: Vec<CelestialEvent>,
    pub weather: WeatherSnapshot,
    pub summary: SnapshotSummary,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}

/// Outcome of one daily update run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: DateTime<Utc>,
    pub events_count: usize,
    pub subscribers_count: usize,
    pub notifications_sent: usize,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskAnswer {
    pub answer: String,
    pub links: Vec<String>,
    pub confidence: f64,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayEvent {
    pub day: &'static str,
    pub event: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub summary: String,
    pub week_events: Vec<DayEvent>,
}
