use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::ai::CompletionService;
use crate::bot::fallback;
use crate::bot::gateway::MessagingGateway;
use crate::bot::lang::Lang;

/// Fixed vision prompt: the description IS the final reply, so it asks for
/// exactly what the user should get back.
const DESCRIBE_PROMPT: &str = "Describe this image succinctly and technically. \
    If it shows equipment or a part, name it, note its apparent condition, and \
    flag any visible defects or wear. Answer in the language of the caption if \
    one is given, otherwise in Persian.";

/// A temp file that is removed when it goes out of scope, whichever way the
/// surrounding function exits.
struct ScopedFile {
    path: PathBuf,
}

impl ScopedFile {
    fn in_temp_dir(prefix: &str, ext: &str) -> Self {
        let path = std::env::temp_dir().join(format!("{prefix}-{}.{ext}", Uuid::new_v4()));
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Turns voice/audio and photo attachments into text for the router.
pub struct MediaPreprocessor {
    gateway: Arc<dyn MessagingGateway>,
    ai: Arc<dyn CompletionService>,
}

impl MediaPreprocessor {
    pub fn new(gateway: Arc<dyn MessagingGateway>, ai: Arc<dyn CompletionService>) -> Self {
        Self { gateway, ai }
    }

    /// Download the attachment and run it through speech-to-text. Every
    /// failure mode (no file path, download error, transcription error)
    /// surfaces as one error the router turns into an apology.
    pub async fn transcribe(&self, file_id: &str) -> Result<String> {
        let tmp = ScopedFile::in_temp_dir("voice", "oga");
        self.gateway
            .download_to(file_id, tmp.path())
            .await
            .context("could not fetch the audio attachment")?;
        let bytes = tokio::fs::read(tmp.path())
            .await
            .context("could not read the downloaded audio")?;
        let text = self
            .ai
            .transcribe(bytes, "voice.oga")
            .await
            .context("transcription failed")?;
        Ok(text.trim().to_string())
    }

    /// Describe an image for the user. Total: any failure or empty result
    /// becomes the locale-appropriate notice, which the router sends as-is.
    pub async fn describe_image(&self, persona: &str, image_url: &str, lang: Lang) -> String {
        match self.ai.describe_image(persona, DESCRIBE_PROMPT, image_url).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback::image_failure_notice(lang).to_string(),
            Err(err) => {
                tracing::warn!("image description failed: {err}");
                fallback::image_failure_notice(lang).to_string()
            }
        }
    }
}
