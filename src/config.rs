use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub openai_model: String,
    /// Model for the speech-to-text endpoint.
    pub transcribe_model: String,

    /// Explicit persona override; wins over everything when non-empty.
    pub persona_text: String,
    /// URL to fetch the persona from when no override is set.
    pub persona_url: String,

    /// Shared secret guarding the webhook maintenance endpoints.
    pub webhook_secret: String,
    /// Public base URL of this service, e.g. "https://bot.example.com".
    /// The webhook is registered as "{public_url}/webhook".
    pub public_url: String,
    pub bind_addr: String,

    pub max_output_tokens: u32,
    /// Upper bound on remembered chats in the topic cache.
    pub topic_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN")
                .context("TELEGRAM_BOT_TOKEN is required")?,
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY is required")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            transcribe_model: std::env::var("TRANSCRIBE_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string()),
            persona_text: std::env::var("PERSONA_TEXT").unwrap_or_default(),
            persona_url: std::env::var("PERSONA_URL").unwrap_or_default(),
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .context("WEBHOOK_SECRET is required")?,
            public_url: std::env::var("PUBLIC_URL").unwrap_or_default(),
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            max_output_tokens: std::env::var("MAX_OUTPUT_TOKENS")
                .unwrap_or_else(|_| "800".to_string())
                .parse()
                .unwrap_or(800),
            topic_capacity: std::env::var("TOPIC_CAPACITY")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .unwrap_or(256),
        })
    }
}
