//! Debate relay - two AI backends debating a user-chosen topic
//!
//! An HTTP service that relays turns between Gemini and `DeepSeek`,
//! keeping each side's conversation memory bounded and resettable.

mod api;
mod config;
mod debate;
mod llm;
mod participant;
mod session;

use api::{create_router, AppState};
use config::AppConfig;
use debate::{prompts::system_prompt, DebateOrchestrator, ProviderAdapter, Sampling};
use llm::{CompletionService, GeminiService, LoggingService, OpenAIService};
use participant::Participant;
use session::SessionStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const GEMINI_SAMPLING: Sampling = Sampling {
    temperature: Some(0.6),
    top_p: None,
};

const DEEPSEEK_SAMPLING: Sampling = Sampling {
    temperature: Some(0.7),
    top_p: Some(1.0),
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debate_relay=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;
    for key in config.missing_keys() {
        tracing::warn!(var = key, "API key not configured, that participant's turns will fail");
    }

    // Providers
    let gemini: Arc<dyn CompletionService> = Arc::new(LoggingService::new(
        Arc::new(GeminiService::new(
            config.gemini.api_key.clone(),
            config.gemini.model.as_str(),
            &config.gemini.base_url,
        )?),
        Participant::Gemini.key(),
    ));
    let deepseek: Arc<dyn CompletionService> = Arc::new(LoggingService::new(
        Arc::new(OpenAIService::new(
            config.deepseek.api_key.clone(),
            config.deepseek.model.as_str(),
            &config.deepseek.base_url,
        )?),
        Participant::DeepSeek.key(),
    ));

    let orchestrator = DebateOrchestrator::new(
        ProviderAdapter::new(Participant::Gemini, gemini, GEMINI_SAMPLING),
        ProviderAdapter::new(Participant::DeepSeek, deepseek, DEEPSEEK_SAMPLING),
        SessionStore::new(config.history_cap, system_prompt),
        config.debate_settings(),
    );
    tracing::info!(
        gemini_model = %orchestrator.model_id(Participant::Gemini),
        deepseek_model = %orchestrator.model_id(Participant::DeepSeek),
        history_cap = config.history_cap,
        turn_delay_ms = %config.turn_delay.as_millis(),
        max_turns = ?config.max_turns,
        "Debate orchestrator initialized"
    );

    let state = AppState::new(orchestrator);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<axum::http::HeaderValue>()?)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(origin = %config.frontend_url, "Debate relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
