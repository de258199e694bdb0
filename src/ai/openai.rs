use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::ai::{CompletionError, CompletionService};
use crate::config::AppConfig;

const API_BASE: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the provider's responses and transcription endpoints.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    transcribe_model: String,
}

/// The two response shapes we accept: a flattened `output_text` field, or a
/// list of output items whose content blocks carry the text. Anything else
/// decodes to empty options and is reported as `Empty`.
#[derive(Debug, Deserialize)]
struct ResponsePayload {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Option<Vec<OutputItem>>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: Option<Vec<ContentBlock>>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionPayload {
    text: String,
}

impl OpenAiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            transcribe_model: config.transcribe_model.clone(),
        }
    }

    async fn post_response_request(
        &self,
        body: serde_json::Value,
    ) -> Result<String, CompletionError> {
        let resp = self
            .client
            .post(format!("{API_BASE}/responses"))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err_body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream(format!(
                "status {status}: {err_body}"
            )));
        }

        let payload: ResponsePayload = resp
            .json()
            .await
            .map_err(|e| CompletionError::Upstream(e.to_string()))?;

        extract_output_text(&payload).ok_or(CompletionError::Empty)
    }
}

/// Closed decoder over the supported shapes: prefer the flat field, else the
/// first non-empty text block inside a message item.
fn extract_output_text(payload: &ResponsePayload) -> Option<String> {
    if let Some(text) = payload.output_text.as_deref() {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    for item in payload.output.as_deref().unwrap_or_default() {
        if item.kind != "message" {
            continue;
        }
        for block in item.content.as_deref().unwrap_or_default() {
            if block.kind != "output_text" {
                continue;
            }
            if let Some(text) = block.text.as_deref() {
                let text = text.trim();
                if !text.is_empty() {
                    return Some(text.to_string());
                }
            }
        }
    }

    None
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(
        &self,
        instructions: &str,
        input: &str,
        max_output_tokens: u32,
    ) -> Result<String, CompletionError> {
        let body = serde_json::json!({
            "model": self.model,
            "instructions": instructions,
            "input": input,
            "temperature": 0.2,
            "max_output_tokens": max_output_tokens,
        });
        self.post_response_request(body).await
    }

    async fn transcribe(
        &self,
        audio: Vec<u8>,
        file_name: &str,
    ) -> Result<String, CompletionError> {
        let part = multipart::Part::bytes(audio)
            .file_name(file_name.to_string())
            .mime_str("audio/ogg")
            .map_err(|e| CompletionError::Upstream(e.to_string()))?;
        let form = multipart::Form::new()
            .text("model", self.transcribe_model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(format!("{API_BASE}/audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CompletionError::Upstream(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err_body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Upstream(format!(
                "status {status}: {err_body}"
            )));
        }

        let payload: TranscriptionPayload = resp
            .json()
            .await
            .map_err(|e| CompletionError::Upstream(e.to_string()))?;

        let text = payload.text.trim().to_string();
        if text.is_empty() {
            return Err(CompletionError::Empty);
        }
        Ok(text)
    }

    async fn describe_image(
        &self,
        instructions: &str,
        prompt: &str,
        image_url: &str,
    ) -> Result<String, CompletionError> {
        let body = serde_json::json!({
            "model": self.model,
            "instructions": instructions,
            "input": [{
                "role": "user",
                "content": [
                    { "type": "input_text", "text": prompt },
                    { "type": "input_image", "image_url": image_url },
                ],
            }],
            "temperature": 0.2,
            "max_output_tokens": 600,
        });
        self.post_response_request(body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(body: &str) -> ResponsePayload {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn flat_output_text_wins() {
        let payload = decode(r#"{"output_text":"Hi there"}"#);
        assert_eq!(extract_output_text(&payload).as_deref(), Some("Hi there"));
    }

    #[test]
    fn nested_blocks_are_scanned() {
        let payload = decode(
            r#"{"output":[
                {"type":"reasoning"},
                {"type":"message","content":[
                    {"type":"refusal","refusal":"no"},
                    {"type":"output_text","text":"  from the blocks  "}
                ]}
            ]}"#,
        );
        assert_eq!(
            extract_output_text(&payload).as_deref(),
            Some("from the blocks")
        );
    }

    #[test]
    fn flat_field_beats_nested_blocks() {
        let payload = decode(
            r#"{"output_text":"flat",
                "output":[{"type":"message","content":[
                    {"type":"output_text","text":"nested"}]}]}"#,
        );
        assert_eq!(extract_output_text(&payload).as_deref(), Some("flat"));
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let payload = decode(
            r#"{"output_text":"   ",
                "output":[{"type":"message","content":[
                    {"type":"output_text","text":"\n"}]}]}"#,
        );
        assert_eq!(extract_output_text(&payload), None);
    }

    #[test]
    fn unknown_shape_is_empty() {
        let payload = decode(r#"{"id":"resp_1","status":"completed"}"#);
        assert_eq!(extract_output_text(&payload), None);
    }
}
