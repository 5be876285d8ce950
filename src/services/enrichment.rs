/// Best-effort expert advice for snapshot events
use crate::clients::{ChatModel, ChatRequest};
use crate::domain::{CelestialEvent, ExpertAdvice, WeatherSnapshot};
use crate::utils::with_fallback;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Marker text used in every field when advice could not be produced
pub const ADVICE_UNAVAILABLE: &str = "Expert advice unavailable";

const ADVICE_MAX_TOKENS: u32 = 600;

pub struct AdviceEnricher {
    model: Option<Arc<dyn ChatModel>>,
    timeout: Duration,
}

impl AdviceEnricher {
    pub fn new(model: Option<Arc<dyn ChatModel>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Advice for `events`; never fails, degrades to placeholders
    pub async fn advise(
        &self,
        events: &[CelestialEvent],
        weather: &WeatherSnapshot,
    ) -> Vec<ExpertAdvice> {
        if events.is_empty() {
            return Vec::new();
        }

        let Some(model) = &self.model else {
            info!("No advice model configured, using placeholders");
            return placeholder_advice(events.len());
        };

        let request = ChatRequest::new(advice_prompt(events, weather), ADVICE_MAX_TOKENS);
        let count = events.len();
        with_fallback(
            "expert advice",
            self.timeout,
            placeholder_advice(count),
            async move {
                let raw = model.complete(request).await?;
                debug!("Advice model raw reply: {}", raw);
                Ok(parse_advice(&raw, count))
            },
        )
        .await
    }
}

fn advice_prompt(events: &[CelestialEvent], weather: &WeatherSnapshot) -> String {
    let mut prompt = String::from(
        "As an astronomy expert, generate a JSON array of expert advice with one object per celestial event, in the same order.\n\
         Each object must contain:\n\
         - observationTips: a brief, actionable tip for amateur astronomers\n\
         - scienceInsight: a scientific insight or interesting fact about the event\n\
         - difficulty: one of \"Beginner\", \"Intermediate\", \"Advanced\"\n\
         - safetyTips: safety considerations for the event\n\n\
         Tonight's celestial events:\n",
    );
    for event in events {
        let _ = writeln!(prompt, "- {}: {}", event.name, event.description);
    }
    let _ = write!(
        prompt,
        "\nWeather conditions:\n- Weather: {}\n- Cloud cover: {}%\n- Visibility: {}m\n- Light pollution: {:?}\n\n\
         Return only a valid JSON array, no explanation, no extra text, no markdown.",
        weather.condition, weather.cloud_cover, weather.visibility, weather.light_pollution
    );
    prompt
}

/// Parse a model reply into advisories, falling back to `count` placeholders
pub fn parse_advice(raw: &str, count: usize) -> Vec<ExpertAdvice> {
    if let Ok(parsed) = serde_json::from_str::<Vec<ExpertAdvice>>(raw.trim()) {
        return parsed;
    }

    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<Vec<ExpertAdvice>>(&raw[start..=end]) {
                return parsed;
            }
        }
    }

    info!("Advice reply was not a JSON array, using placeholders");
    placeholder_advice(count)
}

pub fn placeholder_advice(count: usize) -> Vec<ExpertAdvice> {
    (0..count)
        .map(|_| ExpertAdvice {
            observation_tips: ADVICE_UNAVAILABLE.to_string(),
            science_insight: ADVICE_UNAVAILABLE.to_string(),
            difficulty: ADVICE_UNAVAILABLE.to_string(),
            safety_tips: ADVICE_UNAVAILABLE.to_string(),
        })
        .collect()
}

/// Attach advice in list order; surplus advice is dropped, surplus events keep none
pub fn attach_advice(events: &mut [CelestialEvent], advice: Vec<ExpertAdvice>) {
    for (event, item) in events.iter_mut().zip(advice) {
        event.expert_advice = Some(item);
    }
}
