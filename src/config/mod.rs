/// Application configuration module
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub upstreams: UpstreamConfig,
    pub timeouts: Timeouts,
    pub cron: CronConfig,
    pub snapshot_cache_seconds: u64,
    pub snapshot_model_summary: bool,
    pub ask_daily_limit: u32,
}

/// Upstream endpoints and credentials
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub nasa_apod_url: String,
    pub nasa_api_key: String,
    pub heavens_above_url: String,
    pub mpc_url: String,
    pub weather_api_url: String,
    pub weather_api_key: String,
    pub openrouter_url: String,
    /// Key for the expert advice model; advice degrades to placeholders without it
    pub enrichment_api_key: Option<String>,
    /// Key for question answering and digest summaries
    pub assistant_api_key: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Timeouts {
    pub source_ms: u64,
    pub enrichment_ms: u64,
}

impl Timeouts {
    pub fn source(&self) -> Duration {
        Duration::from_millis(self.source_ms)
    }

    pub fn enrichment(&self) -> Duration {
        Duration::from_millis(self.enrichment_ms)
    }
}

#[derive(Clone, Debug)]
pub struct CronConfig {
    /// Shared bearer secret; every trigger is rejected while unset
    pub secret: Option<String>,
    pub user_agent_markers: Vec<String>,
    pub subscribers: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let upstreams = UpstreamConfig {
            nasa_apod_url: env_or(
                "NASA_APOD_URL",
                "https://api.nasa.gov/planetary/apod",
            ),
            nasa_api_key: env_or("NASA_API_KEY", "DEMO_KEY"),
            heavens_above_url: env_or(
                "HEAVENS_ABOVE_URL",
                "https://www.heavens-above.com/rss.aspx?satid=25544&lat=39.9042&lng=116.4074&alt=0&tz=ChST",
            ),
            mpc_url: env_or("MPC_URL", "https://minorplanetcenter.net/data"),
            weather_api_url: env_or(
                "WEATHER_API_URL",
                "https://api.openweathermap.org/data/2.5/weather",
            ),
            weather_api_key: env_or("WEATHER_API_KEY", "demo_key"),
            openrouter_url: env_or(
                "OPENROUTER_URL",
                "https://openrouter.ai/api/v1/chat/completions",
            ),
            enrichment_api_key: env_opt("LLAMA3_70B_API_KEY"),
            assistant_api_key: env_opt("GPT4O_API_KEY"),
        };

        let timeouts = Timeouts {
            source_ms: env_u64("SOURCE_TIMEOUT_MS", 5000),
            enrichment_ms: env_u64("ENRICHMENT_TIMEOUT_MS", 8000),
        };

        let cron = CronConfig {
            secret: env_opt("CRON_SECRET"),
            user_agent_markers: env_list("CRON_USER_AGENT_MARKERS", &["Vercel", "cron"]),
            subscribers: env_list(
                "SUBSCRIBERS",
                &[
                    "user1@example.com",
                    "user2@example.com",
                    "user3@example.com",
                ],
            ),
        };

        Ok(Self {
            bind_addr,
            upstreams,
            timeouts,
            cron,
            snapshot_cache_seconds: env_u64("SNAPSHOT_CACHE_SECONDS", 300),
            snapshot_model_summary: env_bool("SNAPSHOT_MODEL_SUMMARY", false),
            ask_daily_limit: env_u32("ASK_DAILY_LIMIT", 5),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    match env_opt(key) {
        Some(raw) => split_list(&raw),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
