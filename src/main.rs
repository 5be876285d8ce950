/// Main application entry point
mod clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod routes;
mod services;
mod utils;

use crate::clients::{
    ChatModel, HeavensAboveClient, HttpClient, MpcClient, NasaApodClient, OpenRouterClient,
    OpenWeatherClient,
};
use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::routes::build_router;
use crate::services::{
    AdviceEnricher, AssistantService, DailyUpdateService, InMemoryQuota, LogNotifier,
    RequestCache, SnapshotService, Sources,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("star_collector=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Initialize clients
    let http_client = HttpClient::new()?;
    let upstreams = &config.upstreams;

    let sources = Sources {
        nasa: Arc::new(NasaApodClient::new(
            http_client.clone(),
            upstreams.nasa_apod_url.clone(),
            upstreams.nasa_api_key.clone(),
        )),
        satellites: Arc::new(HeavensAboveClient::new(
            http_client.clone(),
            upstreams.heavens_above_url.clone(),
        )),
        minor_planets: Arc::new(MpcClient::new(http_client.clone(), upstreams.mpc_url.clone())),
        weather: Arc::new(OpenWeatherClient::new(
            http_client.clone(),
            upstreams.weather_api_url.clone(),
            upstreams.weather_api_key.clone(),
        )),
    };

    let chat_model = |api_key: &Option<String>, model: &str| -> Option<Arc<dyn ChatModel>> {
        api_key.clone().map(|key| {
            Arc::new(OpenRouterClient::new(
                http_client.clone(),
                upstreams.openrouter_url.clone(),
                key,
                model,
            )) as Arc<dyn ChatModel>
        })
    };
    let expert_model = chat_model(
        &upstreams.enrichment_api_key,
        OpenRouterClient::EXPERT_MODEL,
    );
    let assistant_model = chat_model(
        &upstreams.assistant_api_key,
        OpenRouterClient::ASSISTANT_MODEL,
    );
    if expert_model.is_none() {
        warn!("LLAMA3_70B_API_KEY not set, expert advice will use placeholders");
    }
    if assistant_model.is_none() {
        warn!("GPT4O_API_KEY not set, assistant answers will be served offline");
    }

    // Initialize services
    let summarizer = assistant_model.clone().filter(|_| config.snapshot_model_summary);
    let snapshot_service = Arc::new(SnapshotService::new(
        sources,
        AdviceEnricher::new(expert_model, config.timeouts.enrichment()),
        summarizer,
        config.timeouts.clone(),
        RequestCache::new(Duration::from_secs(config.snapshot_cache_seconds)),
    ));
    let daily_update_service = Arc::new(DailyUpdateService::new(
        snapshot_service.clone(),
        Arc::new(LogNotifier),
        config.cron.clone(),
    ));
    let assistant_service = Arc::new(AssistantService::new(
        assistant_model,
        Arc::new(InMemoryQuota::new(config.ask_daily_limit)),
        config.timeouts.enrichment(),
    ));
    if config.cron.secret.is_none() {
        warn!("CRON_SECRET not set, scheduled triggers will be rejected");
    }

    // Initialize application state
    let state = AppState {
        snapshot_service,
        daily_update_service,
        assistant_service,
    };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("star_collector listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
