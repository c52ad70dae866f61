//! consult-chat - chat backend with opt-in consultation mode
//!
//! Detects messages that describe a problem, asks before switching to a
//! slower consultation flow, and answers through a remote completion model
//! with bounded retries.

mod acknowledge;
mod api;
mod config;
mod conversation;
mod detection;
mod invoker;
mod llm;
mod prompt;
mod selector;
mod session;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use config::AppConfig;
use conversation::ModeController;
use llm::{LoggingService, OpenAiCompatibleService};
use session::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "consult_chat=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        port = config.server.port,
        default_model = %config.models.default_model,
        deep_model = %config.models.deep_model,
        policy = ?config.confirmation.policy,
        "Configuration loaded"
    );

    let api_key = config.llm.api_key.clone().unwrap_or_else(|| {
        tracing::warn!("No LLM API key configured. Set LLM_API_KEY or llm.api_key.");
        String::new()
    });
    let completion = OpenAiCompatibleService::new(api_key, config.llm.base_url.clone())?;
    let llm = Arc::new(LoggingService::new(Arc::new(completion)));

    // No scoring backends are wired by default; keyword strategies only
    let controller = ModeController::from_config(&config, llm, vec![])?;
    let state = AppState::new(SessionManager::new(controller));
    state
        .sessions
        .start_pruning(config.server.session_prune_interval());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("consult-chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
