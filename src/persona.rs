use std::time::Duration;

use tracing::{info, warn};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Built-in persona: a terse, structured industrial technical advisor.
/// Used whenever no override and no fetchable remote persona is configured.
const DEFAULT_PERSONA: &str = "\
تو یک دستیار فنی صنعتی هستی. پاسخ‌ها باید حرفه‌ای، مختصر و عمل‌گرا باشند. \
ساختار پاسخ: خلاصه؛ فرض‌ها و داده‌ها؛ گام‌های راه‌حل؛ نکات ایمنی و استاندارد؛ گام بعدی. \
اگر داده‌ای کم است، فقط یک سوال شفاف‌کننده بپرس. \
You are an industrial technical advisor. Keep answers professional, concise \
and practical, in the user's language. Structure: summary; assumptions and \
data; solution steps; safety and standards; next step.";

/// Where persona text may come from, in priority order.
pub enum PersonaSource {
    /// Explicit text from configuration; wins when non-empty.
    Override(String),
    /// Fetched from a URL at startup; any failure falls through.
    Remote { url: String },
    /// The compiled-in default; always yields text.
    BuiltIn,
}

/// Walk the sources in order and return the first usable persona text. Total:
/// if every source fails, the built-in default is returned anyway.
pub async fn resolve(sources: Vec<PersonaSource>, http: &reqwest::Client) -> String {
    for source in sources {
        match source {
            PersonaSource::Override(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    info!("persona: using configured override");
                    return text.to_string();
                }
            }
            PersonaSource::Remote { url } => match fetch_remote(&url, http).await {
                Some(text) => {
                    info!("persona: fetched from {url}");
                    return text;
                }
                None => warn!("persona: fetch from {url} failed, falling through"),
            },
            PersonaSource::BuiltIn => {
                info!("persona: using built-in default");
                return DEFAULT_PERSONA.to_string();
            }
        }
    }
    DEFAULT_PERSONA.to_string()
}

async fn fetch_remote(url: &str, http: &reqwest::Client) -> Option<String> {
    let resp = http
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .ok()?
        .error_for_status()
        .ok()?;
    let body = resp.text().await.ok()?;
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    Some(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn override_text_wins_verbatim() {
        let http = reqwest::Client::new();
        let sources = vec![
            PersonaSource::Override("X".to_string()),
            PersonaSource::Remote {
                url: "http://127.0.0.1:1/persona".to_string(),
            },
            PersonaSource::BuiltIn,
        ];
        assert_eq!(resolve(sources, &http).await, "X");
    }

    #[tokio::test]
    async fn blank_override_is_skipped() {
        let http = reqwest::Client::new();
        let sources = vec![
            PersonaSource::Override("   \n ".to_string()),
            PersonaSource::BuiltIn,
        ];
        assert_eq!(resolve(sources, &http).await, DEFAULT_PERSONA);
    }

    #[tokio::test]
    async fn failed_fetch_falls_through_to_default() {
        let http = reqwest::Client::new();
        // Nothing listens on port 1; the connection is refused immediately.
        let sources = vec![
            PersonaSource::Remote {
                url: "http://127.0.0.1:1/persona".to_string(),
            },
            PersonaSource::BuiltIn,
        ];
        assert_eq!(resolve(sources, &http).await, DEFAULT_PERSONA);
    }

    #[tokio::test]
    async fn empty_source_list_still_yields_text() {
        let http = reqwest::Client::new();
        assert!(!resolve(Vec::new(), &http).await.is_empty());
    }
}
