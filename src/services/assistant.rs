/// Astronomy question answering and the weekly sky digest
use super::quota::QuotaStore;
use crate::clients::{ChatModel, ChatRequest};
use crate::domain::{AskAnswer, DayEvent, WeeklySummary};
use crate::errors::{ApiError, ApiResult};
use crate::utils::with_fallback;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const MAX_QUESTION_CHARS: usize = 1000;

const ASSISTANT_PROMPT: &str = "You are an expert astronomy and space science assistant. \
    Explain astronomy, space, planets, stars, galaxies and the universe clearly, accurately and \
    in simple language. Be enthusiastic about space exploration and inspire curiosity.";

const WEEK_EVENTS: &[DayEvent] = &[
    DayEvent { day: "Monday", event: "Jupiter opposition, best viewing at 21:00." },
    DayEvent { day: "Tuesday", event: "First quarter moon, ideal for lunar observation." },
    DayEvent { day: "Wednesday", event: "Mars visible in the east after midnight." },
    DayEvent { day: "Thursday", event: "Perseid meteor shower peaks, up to 20 meteors/hour." },
    DayEvent { day: "Friday", event: "Saturn at highest point, visible all night." },
    DayEvent { day: "Saturday", event: "Clear skies, good for deep sky objects." },
    DayEvent { day: "Sunday", event: "Partial lunar eclipse visible before dawn." },
];

pub struct AssistantService {
    model: Option<Arc<dyn ChatModel>>,
    quota: Arc<dyn QuotaStore>,
    timeout: Duration,
}

impl AssistantService {
    pub fn new(
        model: Option<Arc<dyn ChatModel>>,
        quota: Arc<dyn QuotaStore>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            quota,
            timeout,
        }
    }

    /// Answer one question, charging it to `identity`'s quota for `day`
    pub async fn ask(&self, question: &str, identity: &str, day: NaiveDate) -> ApiResult<AskAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApiError::InvalidInput("Question cannot be empty".into()));
        }
        if question.chars().count() > MAX_QUESTION_CHARS {
            return Err(ApiError::InvalidInput(format!(
                "Question must be at most {} characters",
                MAX_QUESTION_CHARS
            )));
        }
        if !self.quota.check_and_consume(identity, day).await {
            info!("Question quota exhausted for {}", identity);
            return Err(ApiError::QuotaExhausted);
        }

        let answer = match &self.model {
            Some(model) => {
                let request = ChatRequest::new(question, 800).with_system(ASSISTANT_PROMPT);
                with_fallback("assistant", self.timeout, None, async move {
                    model.complete(request).await.map(Some)
                })
                .await
            }
            None => None,
        };

        Ok(match answer {
            Some(answer) => AskAnswer {
                answer,
                links: relevant_links(question),
                confidence: 0.9,
                sources: strings(&["NASA", "ESA", "Scientific Research"]),
            },
            None => offline_answer(question),
        })
    }

    pub async fn weekly_summary(&self) -> WeeklySummary {
        let events_text = WEEK_EVENTS
            .iter()
            .map(|e| format!("{}: {}", e.day, e.event))
            .collect::<Vec<_>>()
            .join("\n");

        let summary = match &self.model {
            Some(model) => {
                let request = ChatRequest::new(
                    format!(
                        "Summarize the following weekly celestial events for astronomy enthusiasts in 2-3 sentences, \
                         highlighting the most exciting phenomena and best viewing opportunities.\n\n{}",
                        events_text
                    ),
                    200,
                )
                .with_system("You are an expert astronomy event summarizer.");
                with_fallback("weekly summary", self.timeout, None, async move {
                    model.complete(request).await.map(Some)
                })
                .await
            }
            None => None,
        };

        WeeklySummary {
            summary: summary.unwrap_or_else(weekly_digest),
            week_events: WEEK_EVENTS.to_vec(),
        }
    }
}

fn weekly_digest() -> String {
    format!(
        "This week brings {} sky highlights, led by {} and {}",
        WEEK_EVENTS.len(),
        WEEK_EVENTS[0].event.trim_end_matches('.').to_lowercase(),
        WEEK_EVENTS[3].event.to_lowercase()
    )
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Reference links chosen by question keywords
pub fn relevant_links(question: &str) -> Vec<String> {
    let q = question.to_lowercase();
    let links: &[&str] = if q.contains("black hole") {
        &[
            "https://en.wikipedia.org/wiki/Black_hole",
            "https://eventhorizontelescope.org/",
            "https://www.nasa.gov/black-holes",
        ]
    } else if q.contains("moon") || q.contains("crater") {
        &[
            "https://en.wikipedia.org/wiki/Lunar_crater",
            "https://www.nasa.gov/mission_pages/LRO/news/lro-craters.html",
            "https://moon.nasa.gov/",
        ]
    } else if q.contains("planet") || q.contains("solar system") {
        &[
            "https://solarsystem.nasa.gov/planets/overview/",
            "https://en.wikipedia.org/wiki/Solar_System",
            "https://www.iau.org/public/themes/pluto/",
        ]
    } else if q.contains("dark matter") {
        &[
            "https://en.wikipedia.org/wiki/Dark_matter",
            "https://science.nasa.gov/astrophysics/focus-areas/what-is-dark-energy",
            "https://home.cern/science/physics/dark-matter",
        ]
    } else {
        &[
            "https://en.wikipedia.org/wiki/Astronomy",
            "https://www.nasa.gov/",
            "https://www.esa.int/",
        ]
    };
    strings(links)
}

/// Canned answers used while the model is unreachable
fn offline_answer(question: &str) -> AskAnswer {
    let key = question.trim_end_matches('?').trim().to_lowercase();
    let preset = match key.as_str() {
        "what is a black hole" => Some((
            "A black hole is a region of spacetime where gravity is so strong that nothing, \
             not even light, can escape once it crosses the event horizon. Stellar black holes \
             form when very massive stars collapse; supermassive ones sit at the centers of most \
             galaxies, including the Milky Way. In 2019 the Event Horizon Telescope produced the \
             first image of a black hole's shadow.",
            0.95,
            &["Event Horizon Telescope", "NASA", "Wikipedia"][..],
        )),
        "why does the moon have craters" => Some((
            "The Moon's craters were blasted out by asteroid and comet impacts. With no \
             atmosphere to burn up incoming objects and almost no erosion or plate tectonics, \
             the Moon preserves those scars for billions of years, while Earth's have mostly \
             been worn away or buried.",
            0.92,
            &["NASA Lunar Reconnaissance Orbiter", "Wikipedia"][..],
        )),
        "how many planets are in the solar system" => Some((
            "There are eight planets: Mercury, Venus, Earth and Mars (rocky), Jupiter and Saturn \
             (gas giants), and Uranus and Neptune (ice giants). Pluto was reclassified as a dwarf \
             planet by the IAU in 2006.",
            0.98,
            &["NASA Solar System Exploration", "IAU", "Wikipedia"][..],
        )),
        "what is dark matter" => Some((
            "Dark matter is matter that neither emits nor absorbs light but reveals itself \
             through gravity: galaxies rotate too fast, and clusters bend light too strongly, \
             for their visible mass alone. It makes up roughly 27% of the universe's \
             matter-energy, and its particle nature is still unknown.",
            0.9,
            &["NASA", "CERN", "Wikipedia"][..],
        )),
        _ => None,
    };

    match preset {
        Some((answer, confidence, sources)) => AskAnswer {
            answer: answer.to_string(),
            links: relevant_links(question),
            confidence,
            sources: strings(sources),
        },
        None => AskAnswer {
            answer: format!(
                "I'm currently unable to reach my astronomy knowledge service to answer \"{}\". \
                 Please try again in a few moments, or ask a different astronomy question.",
                question
            ),
            links: strings(&["https://en.wikipedia.org/wiki/Astronomy", "https://www.nasa.gov/"]),
            confidence: 0.5,
            sources: strings(&["NASA", "Wikipedia"]),
        },
    }
}
