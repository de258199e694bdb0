pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

/// Outcome of a completion call the router can branch on. Transport
/// failures, bad statuses and undecodable payloads all collapse into
/// `Upstream`; a well-formed response with no usable text is `Empty`.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion returned no usable text")]
    Empty,
    #[error("completion request failed: {0}")]
    Upstream(String),
}

/// The external model provider, behind one seam so the router and the media
/// path can be exercised with scripted stubs.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Text in, text out. `instructions` is the persona plus language hint.
    async fn complete(
        &self,
        instructions: &str,
        input: &str,
        max_output_tokens: u32,
    ) -> Result<String, CompletionError>;

    /// Speech-to-text for a downloaded voice/audio attachment.
    async fn transcribe(&self, audio: Vec<u8>, file_name: &str)
        -> Result<String, CompletionError>;

    /// Vision-capable completion over an image URL. The returned text is the
    /// final reply, not an intermediate to feed back through `complete`.
    async fn describe_image(
        &self,
        instructions: &str,
        prompt: &str,
        image_url: &str,
    ) -> Result<String, CompletionError>;
}
