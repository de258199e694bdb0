use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId};

/// Telegram caps messages at 4096 chars; stay under it with room to spare.
const MAX_MESSAGE_LEN: usize = 4000;

/// Everything the router needs from the messaging platform. One logical
/// reply per call; delivery is best-effort with no retries.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// "Typing…" indicator shown while an upstream call is in flight.
    async fn send_typing(&self, chat_id: i64) -> Result<()>;

    /// Public download URL for an attachment.
    async fn file_url(&self, file_id: &str) -> Result<String>;

    /// Download an attachment into `dest`.
    async fn download_to(&self, file_id: &str, dest: &Path) -> Result<()>;

    async fn register_webhook(&self, url: &str) -> Result<()>;

    async fn unregister_webhook(&self) -> Result<()>;
}

/// Production gateway over the Telegram Bot API.
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            self.bot
                .send_message(ChatId(chat_id), chunk)
                .await
                .context("sendMessage failed")?;
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> Result<()> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .context("sendChatAction failed")?;
        Ok(())
    }

    async fn file_url(&self, file_id: &str) -> Result<String> {
        let file = self
            .bot
            .get_file(file_id)
            .await
            .context("getFile failed")?;
        Ok(format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        ))
    }

    async fn download_to(&self, file_id: &str, dest: &Path) -> Result<()> {
        let file = self
            .bot
            .get_file(file_id)
            .await
            .context("getFile failed")?;
        let mut out = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("creating {}", dest.display()))?;
        self.bot
            .download_file(&file.path, &mut out)
            .await
            .context("file download failed")?;
        Ok(())
    }

    async fn register_webhook(&self, url: &str) -> Result<()> {
        let url = Url::parse(url).with_context(|| format!("bad webhook url: {url}"))?;
        self.bot
            .set_webhook(url)
            .await
            .context("setWebhook failed")?;
        Ok(())
    }

    async fn unregister_webhook(&self) -> Result<()> {
        self.bot
            .delete_webhook()
            .await
            .context("deleteWebhook failed")?;
        Ok(())
    }
}

/// Split a long reply on char boundaries, preferring newline then space, so
/// multi-byte text never lands on a broken boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let cut = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..cut].to_string());
        start = cut;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_stay_whole() {
        assert_eq!(split_message("سلام", 4000), vec!["سلام".to_string()]);
    }

    #[test]
    fn long_messages_split_and_recombine() {
        let text = "یک ".repeat(900);
        let chunks = split_message(&text, 200);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 200));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_prefers_line_breaks() {
        let text = format!("{}\n{}", "a".repeat(150), "b".repeat(100));
        let chunks = split_message(&text, 200);
        assert_eq!(chunks[0], format!("{}\n", "a".repeat(150)));
    }
}
