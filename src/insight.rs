//! AI insight generation
//!
//! Anthropic Messages API client behind the `InsightGenerator` seam. The
//! relay builds the full instruction and prompt text; this module only
//! transports it and hands back the joined text blocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MODEL: &str = "claude-3-5-haiku-20241022";
const MAX_TOKENS: usize = 1024;
const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the completion call.
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider error {status}: {message}")]
    Api { status: u16, message: String },
}

/// Text-completion seam.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Run one completion. An empty result string is valid as far as this
    /// seam is concerned; the caller decides how to present it.
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, InsightError>;
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'static str,
    max_tokens: usize,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    r#type: String,
    text: Option<String>,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl InsightGenerator for AnthropicClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, InsightError> {
        let request = MessageRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!("calling insight model: prompt_len={}", prompt.len());

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .timeout(GENERATE_TIMEOUT)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InsightError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let result: MessageResponse = response.json().await?;
        Ok(result
            .content
            .into_iter()
            .filter_map(|b| if b.r#type == "text" { b.text } else { None })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
