use crate::clients::{ChatModel, ChatRequest};
use crate::domain::{
    CelestialEvent, LightPollution, SnapshotSummary, Visibility, WeatherSnapshot,
};
use crate::utils::with_fallback;
use std::fmt::Write;
use std::time::Duration;

const CLEAR_SKY_BELOW: f64 = 30.0;
const MODERATE_SKY_BELOW: f64 = 70.0;

pub fn build_summary(
    events: &[CelestialEvent],
    weather: &WeatherSnapshot,
    model_summary: Option<String>,
) -> SnapshotSummary {
    SnapshotSummary {
        total_events: events.len(),
        best_event: best_event(events).cloned(),
        recommendations: vec![fallback_summary(events, weather)],
        model_summary,
    }
}

fn best_event(events: &[CelestialEvent]) -> Option<&CelestialEvent> {
    events
        .iter()
        .find(|e| e.visibility == Visibility::Excellent)
}

/// Deterministic one-paragraph recommendation
pub fn fallback_summary(events: &[CelestialEvent], weather: &WeatherSnapshot) -> String {
    let mut summary = format!(
        "Tonight there are {} celestial events worth observing.",
        events.len()
    );

    if let Some(best) = best_event(events) {
        let _ = write!(
            summary,
            " Among them, {} has the best viewing conditions, recommended for observation at {}.",
            best.name, best.best_time
        );
    }

    summary.push_str(if weather.cloud_cover < CLEAR_SKY_BELOW {
        " Tonight's weather is clear with minimal cloud cover, perfect for stargazing."
    } else if weather.cloud_cover < MODERATE_SKY_BELOW {
        " Tonight has moderate cloud cover, suggest choosing times with less cloud coverage for observation."
    } else {
        " Tonight has heavy cloud cover, poor viewing conditions, suggest trying another day."
    });

    match weather.light_pollution {
        LightPollution::Low => {
            summary.push_str(" Light pollution is minimal, great time to observe faint objects.")
        }
        LightPollution::High => {
            summary.push_str(" Urban light pollution is heavy, recommend observing bright objects.")
        }
        LightPollution::Medium => {}
    }

    summary
}

/// Short model-written summary; `None` when the model fails or is slow
pub async fn model_summary(
    model: &dyn ChatModel,
    events: &[CelestialEvent],
    weather: &WeatherSnapshot,
    timeout: Duration,
) -> Option<String> {
    if events.is_empty() {
        return None;
    }

    let mut prompt = String::from(
        "Summarize tonight's celestial events for astronomy enthusiasts in 2-3 sentences, \
         highlighting the most exciting phenomena and best viewing opportunities.\n\n",
    );
    for event in events {
        let _ = writeln!(prompt, "{} ({}): {}", event.name, event.best_time, event.description);
    }
    let _ = write!(
        prompt,
        "\nWeather: {}, {}% cloud cover.",
        weather.condition, weather.cloud_cover
    );

    let request =
        ChatRequest::new(prompt, 200).with_system("You are an expert astronomy event summarizer.");
    with_fallback("model summary", timeout, None, async move {
        let text = model.complete(request).await?;
        Ok(Some(text.trim().to_string()))
    })
    .await
}
