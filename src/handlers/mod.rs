/// HTTP request handlers
use crate::domain::{AggregatedResponse, AskAnswer, DailyReport, Health, Location, WeeklySummary};
use crate::errors::{ApiError, ApiResult};
use crate::services::{AssistantService, CronAuth, DailyUpdateService, SnapshotService};
use crate::utils::parse_coord;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::{header, HeaderMap},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub snapshot_service: Arc<SnapshotService>,
    pub daily_update_service: Arc<DailyUpdateService>,
    pub assistant_service: Arc<AssistantService>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub test: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Resolve the snapshot location from query parameters, defaulting anything unusable
pub fn location_from_query(params: &HashMap<String, String>) -> Location {
    let defaults = Location::default();
    Location {
        lat: parse_coord(params.get("lat").map(String::as_str)).unwrap_or(defaults.lat),
        lng: parse_coord(params.get("lng").map(String::as_str)).unwrap_or(defaults.lng),
        city: params
            .get("city")
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or(defaults.city),
        timezone: defaults.timezone,
    }
}

/// Aggregated celestial snapshot
pub async fn get_celestial_snapshot(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Json<SuccessResponse<AggregatedResponse>> {
    let location = location_from_query(&params);
    let snapshot = state.snapshot_service.cached(location).await;
    Json(SuccessResponse::new(snapshot))
}

/// Scheduled-task acknowledgement on the snapshot path
pub async fn post_celestial_snapshot(
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload.map_err(|e| ApiError::Internal(e.body_text()))?;

    match request.action.as_deref() {
        Some("daily_update") => {
            info!("Daily update acknowledged on snapshot endpoint");
            Ok(Json(json!({
                "success": true,
                "message": "Daily update task executed successfully"
            })))
        }
        _ => Ok(Json(json!({
            "success": false,
            "error": "Unknown scheduled task type"
        }))),
    }
}

fn cron_auth(headers: &HeaderMap) -> CronAuth<'_> {
    CronAuth {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
        user_agent: headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()),
    }
}

/// Daily update trigger for the external scheduler
pub async fn run_daily_update(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<SuccessResponse<DailyReport>>> {
    state.daily_update_service.authorize(cron_auth(&headers))?;
    let report = state.daily_update_service.run().await;
    Ok(Json(SuccessResponse::new(report)))
}

/// Manual daily update; `test: true` skips the credential check
pub async fn trigger_daily_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ActionRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload.map_err(|e| ApiError::Internal(e.body_text()))?;

    if request.action.as_deref() != Some("manual_trigger") {
        return Ok(Json(json!({
            "success": false,
            "error": "Unknown action type"
        })));
    }

    if request.test {
        warn!("Manual daily update in test mode, credential check skipped");
    } else {
        state.daily_update_service.authorize(cron_auth(&headers))?;
    }

    let report = state.daily_update_service.rebuild().await;
    Ok(Json(json!({
        "success": true,
        "message": "Manual update executed successfully",
        "data": {
            "date": report.date,
            "eventsCount": report.events_count,
            "summary": report.summary,
        }
    })))
}

/// Quota identity: the caller's `userId`, else their peer address
pub fn quota_identity(user_id: Option<String>, peer: Option<SocketAddr>) -> String {
    match user_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()) {
        Some(id) => format!("user:{}", id),
        None => match peer {
            Some(addr) => format!("anonymous:{}", addr.ip()),
            None => "anonymous".to_string(),
        },
    }
}

/// Astronomy question answering
pub async fn ask_universe(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse<AskAnswer>>> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    let question = request.question.unwrap_or_default();
    let identity = quota_identity(request.user_id, peer.map(|ConnectInfo(addr)| addr));

    let answer = state
        .assistant_service
        .ask(&question, &identity, Utc::now().date_naive())
        .await?;
    Ok(Json(SuccessResponse::new(answer)))
}

/// Weekly sky digest
pub async fn get_weekly_summary(State(state): State<AppState>) -> Json<WeeklySummary> {
    Json(state.assistant_service.weekly_summary().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_location_defaults() {
        let loc = location_from_query(&HashMap::new());
        assert_eq!(loc, Location::default());
        assert_eq!(loc.city, "New York");
        assert_eq!(loc.timezone, "America/New_York");
    }

    #[test]
    fn test_location_bad_numbers_default() {
        let loc = location_from_query(&params(&[("lat", "abc"), ("lng", "12.5"), ("city", " ")]));
        assert_eq!(loc.lat, Location::default().lat);
        assert_eq!(loc.lng, 12.5);
        assert_eq!(loc.city, "New York");
    }

    #[test]
    fn test_quota_identity_prefers_user_id() {
        let peer: SocketAddr = "203.0.113.7:5150".parse().unwrap();
        assert_eq!(quota_identity(Some("u1".into()), Some(peer)), "user:u1");
        assert_eq!(quota_identity(Some("  ".into()), Some(peer)), "anonymous:203.0.113.7");
        assert_eq!(quota_identity(None, None), "anonymous");
    }

    #[test]
    fn test_location_from_query() {
        let loc = location_from_query(&params(&[
            ("lat", "34.05"),
            ("lng", "-118.24"),
            ("city", "Los Angeles"),
        ]));
        assert_eq!(loc.lat, 34.05);
        assert_eq!(loc.lng, -118.24);
        assert_eq!(loc.city, "Los Angeles");
    }
}
