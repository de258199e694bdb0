use std::sync::Arc;

use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

mod ai;
mod bot;
mod config;
mod persona;
mod server;

use ai::openai::OpenAiClient;
use ai::CompletionService;
use bot::gateway::{MessagingGateway, TelegramGateway};
use bot::router::UpdateRouter;
use bot::topic::TopicMemory;
use bot::AppState;
use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🤖 Starting relay bot...");

    // Load config; missing credentials abort here, before serving traffic.
    let config = AppConfig::from_env()?;
    tracing::info!("Config loaded. Model: {}", config.openai_model);

    // Resolve the persona once; it is immutable for the process lifetime.
    let http = reqwest::Client::new();
    let mut sources = vec![persona::PersonaSource::Override(config.persona_text.clone())];
    if !config.persona_url.trim().is_empty() {
        sources.push(persona::PersonaSource::Remote {
            url: config.persona_url.clone(),
        });
    }
    sources.push(persona::PersonaSource::BuiltIn);
    let persona = persona::resolve(sources, &http).await;

    // Wire the gateway, the completion client and the router together.
    let bot = Bot::new(config.telegram_bot_token.clone());
    let gateway: Arc<dyn MessagingGateway> = Arc::new(TelegramGateway::new(bot));
    let ai_client: Arc<dyn CompletionService> = Arc::new(OpenAiClient::new(&config));
    let router = UpdateRouter::new(
        Arc::clone(&gateway),
        ai_client,
        TopicMemory::new(config.topic_capacity),
        persona,
        config.max_output_tokens,
    );

    let state = Arc::new(AppState {
        config,
        gateway,
        router,
    });

    let app = server::build_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    tracing::info!("Listening on {}", state.config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
