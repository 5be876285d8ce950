/// Celestial snapshot pipeline
use super::cache::RequestCache;
use super::enrichment::{attach_advice, AdviceEnricher};
use super::summary::{build_summary, model_summary};
use crate::clients::{ChatModel, EventFeed, WeatherProvider};
use crate::config::Timeouts;
use crate::domain::{
    AggregatedResponse, CelestialEvent, EventType, Location, Visibility, WeatherSnapshot,
    MAX_EVENTS, SOURCE_HEAVENS_ABOVE, SOURCE_MPC, SOURCE_NASA,
};
use crate::utils::{s_pick, with_fallback};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Placeholder title some feeds return instead of data
const MISSING_RESOURCE_TITLE: &str = "The resource cannot be found.";

/// Upstream collaborators, in merge order
pub struct Sources {
    pub nasa: Arc<dyn EventFeed>,
    pub satellites: Arc<dyn EventFeed>,
    pub minor_planets: Arc<dyn EventFeed>,
    pub weather: Arc<dyn WeatherProvider>,
}

pub struct SnapshotService {
    sources: Sources,
    enricher: AdviceEnricher,
    summarizer: Option<Arc<dyn ChatModel>>,
    timeouts: Timeouts,
    cache: RequestCache<AggregatedResponse>,
}

impl SnapshotService {
    pub fn new(
        sources: Sources,
        enricher: AdviceEnricher,
        summarizer: Option<Arc<dyn ChatModel>>,
        timeouts: Timeouts,
        cache: RequestCache<AggregatedResponse>,
    ) -> Self {
        Self {
            sources,
            enricher,
            summarizer,
            timeouts,
            cache,
        }
    }

    /// Build a fresh snapshot. Upstream failures only ever degrade the result.
    pub async fn snapshot(&self, location: Location) -> AggregatedResponse {
        info!(
            "Fetching celestial data for {} ({}, {})",
            location.city, location.lat, location.lng
        );

        let limit = self.timeouts.source();
        let (nasa, satellites, minor_planets, weather) = tokio::join!(
            with_fallback(
                self.sources.nasa.name(),
                limit,
                Vec::new(),
                self.sources.nasa.fetch()
            ),
            with_fallback(
                self.sources.satellites.name(),
                limit,
                Vec::new(),
                self.sources.satellites.fetch()
            ),
            with_fallback(
                self.sources.minor_planets.name(),
                limit,
                Vec::new(),
                self.sources.minor_planets.fetch()
            ),
            with_fallback(
                "weather",
                limit,
                WeatherSnapshot::default(),
                self.sources.weather.current(location.lat, location.lng)
            ),
        );

        let mut events = normalize_events(&nasa, &satellites, &minor_planets);

        let (advice, model_text) = tokio::join!(
            self.enricher.advise(&events, &weather),
            self.model_summary(&events, &weather),
        );
        attach_advice(&mut events, advice);

        let summary = build_summary(&events, &weather, model_text);
        info!(
            "Snapshot for {} ready with {} events",
            location.city, summary.total_events
        );

        AggregatedResponse {
            location,
            date: Utc::now(),
            events,
            weather,
            summary,
        }
    }

    /// Snapshot served through the request cache
    pub async fn cached(self: &Arc<Self>, location: Location) -> AggregatedResponse {
        let key = cache_key(&location);
        let service = Arc::clone(self);
        self.cache
            .get_or_fetch(&key, move || async move { service.snapshot(location).await })
            .await
    }

    /// Rebuild a snapshot and overwrite its cache entry
    pub async fn refresh(&self, location: Location) -> AggregatedResponse {
        let key = cache_key(&location);
        let snapshot = self.snapshot(location).await;
        self.cache.insert(&key, snapshot.clone());
        snapshot
    }

    async fn model_summary(
        &self,
        events: &[CelestialEvent],
        weather: &WeatherSnapshot,
    ) -> Option<String> {
        match &self.summarizer {
            Some(model) => {
                model_summary(model.as_ref(), events, weather, self.timeouts.enrichment()).await
            }
            None => None,
        }
    }
}

fn cache_key(location: &Location) -> String {
    format!(
        "{:.4}:{:.4}:{}",
        location.lat,
        location.lng,
        location.city.to_lowercase()
    )
}

/// Map raw feed records to events, NASA first, then satellites, then minor planets
pub fn normalize_events(
    nasa: &[Value],
    satellites: &[Value],
    minor_planets: &[Value],
) -> Vec<CelestialEvent> {
    let mut events = Vec::new();

    for (index, item) in nasa.iter().enumerate() {
        let (Some(title), Some(explanation)) = (
            s_pick(item, &["title"]),
            s_pick(item, &["explanation"]),
        ) else {
            continue;
        };
        events.push(CelestialEvent {
            id: format!("nasa_{}", index),
            name: title,
            kind: EventType::Star,
            description: explanation,
            best_time: "20:00 - 22:00".to_string(),
            visibility: Visibility::Good,
            source: SOURCE_NASA.to_string(),
            published_at: s_pick(item, &["date"]),
            expert_advice: None,
        });
    }

    for (index, item) in satellites.iter().enumerate() {
        let Some(title) = feed_title(item) else {
            continue;
        };
        events.push(CelestialEvent {
            id: format!("ha_{}", index),
            name: title,
            kind: EventType::Satellite,
            description: "Satellite transit observation opportunity".to_string(),
            best_time: "19:30 - 21:30".to_string(),
            visibility: Visibility::Fair,
            source: SOURCE_HEAVENS_ABOVE.to_string(),
            published_at: None,
            expert_advice: None,
        });
    }

    for (index, item) in minor_planets.iter().enumerate() {
        let Some(title) = feed_title(item) else {
            continue;
        };
        let (kind, description) = match item["type"].as_str() {
            Some("comet") => (EventType::Comet, "Comet observation opportunity"),
            _ => (EventType::Asteroid, "Asteroid observation opportunity"),
        };
        events.push(CelestialEvent {
            id: format!("mpc_{}", index),
            name: title,
            kind,
            description: description.to_string(),
            best_time: "21:00 - 23:00".to_string(),
            visibility: Visibility::Fair,
            source: SOURCE_MPC.to_string(),
            published_at: None,
            expert_advice: None,
        });
    }

    events.truncate(MAX_EVENTS);
    events
}

fn feed_title(item: &Value) -> Option<String> {
    s_pick(item, &["title"]).filter(|t| t != MISSING_RESOURCE_TITLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LightPollution;
    use crate::services::enrichment::ADVICE_UNAVAILABLE;
    use crate::services::stubs::{FailingFeed, ScriptedModel, StaticFeed, StaticWeather};
    use serde_json::json;
    use std::time::Duration;

    fn apod() -> Value {
        json!({"title": "Orion Nebula", "explanation": "A stellar nursery.", "date": "2025-03-01"})
    }

    fn sat(title: &str) -> Value {
        json!({"title": title, "source": SOURCE_HEAVENS_ABOVE, "type": "satellite"})
    }

    fn comet(title: &str) -> Value {
        json!({"title": title, "source": SOURCE_MPC, "type": "comet"})
    }

    fn timeouts() -> Timeouts {
        Timeouts {
            source_ms: 5000,
            enrichment_ms: 5000,
        }
    }

    fn service(sources: Sources, model: Option<Arc<dyn ChatModel>>) -> SnapshotService {
        SnapshotService::new(
            sources,
            AdviceEnricher::new(model, Duration::from_secs(5)),
            None,
            timeouts(),
            RequestCache::new(Duration::from_secs(60)),
        )
    }

    fn clear_weather() -> WeatherSnapshot {
        WeatherSnapshot {
            condition: "Clear".into(),
            cloud_cover: 20.0,
            humidity: 50.0,
            visibility: 10000.0,
            light_pollution: LightPollution::Medium,
        }
    }

    #[test]
    fn test_normalize_drops_incomplete_records() {
        let nasa = vec![json!({"title": "No explanation"}), apod()];
        let sats = vec![sat(MISSING_RESOURCE_TITLE), json!({"source": "x"})];
        let events = normalize_events(&nasa, &sats, &[]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "nasa_1");
        assert_eq!(events[0].published_at.as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn test_normalize_orders_by_source_and_bounds() {
        let sats: Vec<_> = (0..3).map(|i| sat(&format!("ISS pass {}", i))).collect();
        let comets: Vec<_> = (0..3).map(|i| comet(&format!("COMET {}", i))).collect();
        let events = normalize_events(&[apod()], &sats, &comets);

        assert_eq!(events.len(), MAX_EVENTS);
        let sources: Vec<&str> = events.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                SOURCE_NASA,
                SOURCE_HEAVENS_ABOVE,
                SOURCE_HEAVENS_ABOVE,
                SOURCE_HEAVENS_ABOVE,
                SOURCE_MPC
            ]
        );
        assert_eq!(events[4].kind, EventType::Comet);
        assert_eq!(events[4].description, "Comet observation opportunity");
    }

    #[test]
    fn test_normalize_minor_planet_defaults_to_asteroid() {
        let rock = json!({"title": "ASTEROID 2024 YR4", "type": "asteroid"});
        let events = normalize_events(&[], &[], &[rock]);
        assert_eq!(events[0].kind, EventType::Asteroid);
        assert_eq!(events[0].best_time, "21:00 - 23:00");
        assert_eq!(events[0].visibility, Visibility::Fair);
    }

    #[tokio::test(start_paused = true)]
    async fn test_everything_failing_still_yields_snapshot() {
        let svc = service(
            Sources {
                nasa: Arc::new(FailingFeed(SOURCE_NASA)),
                satellites: Arc::new(FailingFeed(SOURCE_HEAVENS_ABOVE)),
                minor_planets: Arc::new(
                    StaticFeed::new(SOURCE_MPC, vec![comet("COMET late")])
                        .delayed(Duration::from_secs(30)),
                ),
                weather: Arc::new(StaticWeather::failing()),
            },
            None,
        );

        let snap = svc.snapshot(Location::default()).await;
        assert!(snap.events.is_empty());
        assert_eq!(snap.weather, WeatherSnapshot::default());
        assert_eq!(snap.summary.total_events, 0);
        assert!(snap.summary.recommendations[0].contains("0 celestial events"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_does_not_block_others() {
        let svc = service(
            Sources {
                nasa: Arc::new(StaticFeed::new(SOURCE_NASA, vec![]).delayed(Duration::from_secs(60))),
                satellites: Arc::new(StaticFeed::new(
                    SOURCE_HEAVENS_ABOVE,
                    vec![sat("ISS pass 19:42")],
                )),
                minor_planets: Arc::new(StaticFeed::new(SOURCE_MPC, vec![comet("COMET A")])),
                weather: Arc::new(StaticWeather::ok(clear_weather())),
            },
            None,
        );

        let started = tokio::time::Instant::now();
        let snap = svc.snapshot(Location::default()).await;
        assert!(started.elapsed() < Duration::from_secs(6));
        assert_eq!(snap.events.len(), 2);
        assert_eq!(snap.events[0].source, SOURCE_HEAVENS_ABOVE);
        assert_eq!(snap.events[1].source, SOURCE_MPC);
    }

    #[tokio::test]
    async fn test_advice_attached_in_order() {
        let reply = r#"Here you go: [{"observationTips": "first", "scienceInsight": "s", "difficulty": "Beginner", "safetyTips": "t"}]"#;
        let svc = service(
            Sources {
                nasa: Arc::new(StaticFeed::new(SOURCE_NASA, vec![apod()])),
                satellites: Arc::new(StaticFeed::new(
                    SOURCE_HEAVENS_ABOVE,
                    vec![sat("ISS pass 19:42")],
                )),
                minor_planets: Arc::new(StaticFeed::new(SOURCE_MPC, vec![])),
                weather: Arc::new(StaticWeather::ok(clear_weather())),
            },
            Some(Arc::new(ScriptedModel::replying(reply))),
        );

        let snap = svc.snapshot(Location::default()).await;
        assert_eq!(snap.events.len(), 2);
        assert_eq!(
            snap.events[0].expert_advice.as_ref().unwrap().observation_tips,
            "first"
        );
        assert!(snap.events[1].expert_advice.is_none());
    }

    #[tokio::test]
    async fn test_missing_model_gives_placeholder_advice() {
        let svc = service(
            Sources {
                nasa: Arc::new(StaticFeed::new(SOURCE_NASA, vec![apod()])),
                satellites: Arc::new(StaticFeed::new(SOURCE_HEAVENS_ABOVE, vec![])),
                minor_planets: Arc::new(StaticFeed::new(SOURCE_MPC, vec![])),
                weather: Arc::new(StaticWeather::ok(clear_weather())),
            },
            None,
        );

        let snap = svc.snapshot(Location::default()).await;
        let advice = snap.events[0].expert_advice.as_ref().unwrap();
        assert_eq!(advice.difficulty, ADVICE_UNAVAILABLE);
        assert!(snap.summary.model_summary.is_none());
    }

    #[tokio::test]
    async fn test_model_summary_is_separate_from_template() {
        let svc = SnapshotService::new(
            Sources {
                nasa: Arc::new(StaticFeed::new(SOURCE_NASA, vec![apod()])),
                satellites: Arc::new(StaticFeed::new(SOURCE_HEAVENS_ABOVE, vec![])),
                minor_planets: Arc::new(StaticFeed::new(SOURCE_MPC, vec![])),
                weather: Arc::new(StaticWeather::ok(clear_weather())),
            },
            AdviceEnricher::new(None, Duration::from_secs(5)),
            Some(Arc::new(ScriptedModel::replying("  Orion shines tonight.  "))),
            timeouts(),
            RequestCache::new(Duration::from_secs(60)),
        );

        let snap = svc.snapshot(Location::default()).await;
        assert_eq!(snap.summary.model_summary.as_deref(), Some("Orion shines tonight."));
        assert!(snap.summary.recommendations[0].starts_with("Tonight there are 1"));
    }

    #[tokio::test]
    async fn test_cached_snapshot_reuses_upstream_results() {
        let nasa = Arc::new(StaticFeed::new(SOURCE_NASA, vec![apod()]));
        let svc = Arc::new(service(
            Sources {
                nasa: nasa.clone(),
                satellites: Arc::new(StaticFeed::new(SOURCE_HEAVENS_ABOVE, vec![])),
                minor_planets: Arc::new(StaticFeed::new(SOURCE_MPC, vec![])),
                weather: Arc::new(StaticWeather::ok(clear_weather())),
            },
            None,
        ));

        let first = svc.cached(Location::default()).await;
        let second = svc.cached(Location::default()).await;
        assert_eq!(first, second);
        assert_eq!(nasa.calls(), 1);

        svc.refresh(Location::default()).await;
        assert_eq!(nasa.calls(), 2);
    }
}
