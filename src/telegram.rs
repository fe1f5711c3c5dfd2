//! Outbound Telegram delivery
//!
//! Best-effort `sendMessage` client for the Bot API. The webhook must
//! acknowledge the inbound update no matter what happens here, so callers
//! log send failures and move on rather than propagating them.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the outbound send path.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram error {status}: {body}")]
    Api { status: u16, body: String },
}

/// Telegram text formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Telegram's lightweight markup. Default for all relay replies.
    Markdown,
    Html,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
            Self::Html => "HTML",
        }
    }
}

/// Outbound message delivery seam.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, chat_id: i64, text: &str, parse_mode: ParseMode)
        -> Result<(), SendError>;
}

/// Bot API client.
pub struct TelegramApi {
    client: reqwest::Client,
    send_url: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

impl TelegramApi {
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            send_url: format!("{}/bot{}/sendMessage", TELEGRAM_API_URL, token),
        }
    }
}

#[async_trait]
impl Messenger for TelegramApi {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: ParseMode,
    ) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.send_url)
            .timeout(SEND_TIMEOUT)
            .json(&SendMessageRequest {
                chat_id,
                text,
                parse_mode: parse_mode.as_str(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SendError::Api { status, body });
        }

        debug!("sent {} chars to chat {}", text.len(), chat_id);
        Ok(())
    }
}
