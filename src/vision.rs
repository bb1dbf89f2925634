//! Vision model clients.
//!
//! The assessment pipeline treats the model as a black box: image bytes in,
//! free-form text out. Concrete providers implement [`ModelClient`] and are
//! selected by `[model].provider` in the configuration via
//! [`create_client`]. Every call is a single attempt — failures surface to
//! the orchestrator instead of being retried here.
//!
//! API keys come from the environment (`GEMINI_API_KEY`, `OPENAI_API_KEY`),
//! never from the config file.

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ModelConfig;

/// Prompt sent alongside every image.
const ASSESSOR_PROMPT: &str = r#"You are an expert car damage assessor.

Return the output ONLY as valid JSON in this exact structure:

{
  "damages": [
    {"part": "string (e.g. front bumper)", "damage_type": "string (e.g. dent/scratch/broken)"}
  ],
  "estimated_cost": {
    "usd": "string (range or number, e.g. 50-100 / 75)",
    "inr": "string",
    "jpy": "string"
  },
  "notes": "short note about hidden/structural concerns"
}

Rules:
- Do not print any text outside the JSON object.
- Use plain numbers or ranges inside the cost strings (currency symbol optional).
"#;

/// A vision model that assesses vehicle damage from an image.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider identifier used in logs and error messages.
    fn name(&self) -> &str;

    /// Send the image to the model and return its raw text answer.
    async fn assess(&self, image: &[u8], mime: &str) -> Result<String>;
}

/// Instantiate the provider named in the configuration.
pub fn create_client(config: &ModelConfig) -> Result<Arc<dyn ModelClient>> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiClient::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIClient::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledClient)),
        other => bail!("Unknown model provider: {}", other),
    }
}

// ============ Disabled Client ============

/// A no-op client used when `model.provider = "disabled"`. Any assessment
/// attempt fails, which the orchestrator contains as an error payload.
pub struct DisabledClient;

#[async_trait]
impl ModelClient for DisabledClient {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn assess(&self, _image: &[u8], _mime: &str) -> Result<String> {
        bail!("Model provider is disabled")
    }
}

// ============ Gemini Client ============

/// Client for the Google Gemini `generateContent` API.
///
/// The image travels inline as base64 next to the assessor prompt.
/// Requires the `GEMINI_API_KEY` environment variable.
pub struct GeminiClient {
    model: String,
    api_key: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("model.model required for Gemini provider"))?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn assess(&self, image: &[u8], mime: &str) -> Result<String> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": ASSESSOR_PROMPT },
                    { "inline_data": { "mime_type": mime, "data": encoded } }
                ]
            }]
        });

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let response = client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_gemini_response(&json)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidates"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        bail!("Invalid Gemini response: no text parts");
    }

    Ok(text)
}

// ============ OpenAI Client ============

/// Client for the OpenAI chat completions API with image input.
///
/// The image travels as a base64 data URL content part. Requires the
/// `OPENAI_API_KEY` environment variable.
pub struct OpenAIClient {
    model: String,
    api_key: String,
    timeout: Duration,
}

impl OpenAIClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("model.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        Ok(Self {
            model,
            api_key,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl ModelClient for OpenAIClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn assess(&self, image: &[u8], mime: &str) -> Result<String> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let data_url = format!("data:{};base64,{}", mime, encoded);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ASSESSOR_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        });

        let response = client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_gemini_response_joins_text_parts() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"damages\"" }, { "text": ": []}" }] }
            }]
        });
        assert_eq!(
            parse_gemini_response(&response).unwrap(),
            "{\"damages\": []}"
        );
    }

    #[test]
    fn test_parse_gemini_response_rejects_empty() {
        assert!(parse_gemini_response(&json!({})).is_err());
        assert!(parse_gemini_response(&json!({ "candidates": [] })).is_err());
    }

    #[test]
    fn test_parse_openai_response() {
        let response = json!({
            "choices": [{ "message": { "content": "{\"notes\":\"ok\"}" } }]
        });
        assert_eq!(
            parse_openai_response(&response).unwrap(),
            "{\"notes\":\"ok\"}"
        );
        assert!(parse_openai_response(&json!({ "choices": [] })).is_err());
    }
}
