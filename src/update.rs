//! Inbound webhook decoding
//!
//! Telegram delivers updates as JSON POST bodies. Anything that does not
//! carry a chat id (malformed JSON, non-message updates, keep-alive
//! payloads) decodes to `None` and is acknowledged without further work,
//! so the provider never sees a failure status and never retry-storms.

use serde::Deserialize;

/// Telegram update envelope. Only the fields the relay consumes.
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

/// Normalized per-request message. Created on decode, dropped after handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub chat_id: i64,
    /// Trimmed message text; empty when the update carried none.
    pub text: String,
}

/// Decode a raw webhook body into a normalized message.
///
/// Returns `None` for anything the relay should acknowledge and ignore.
pub fn decode(body: &[u8]) -> Option<IncomingMessage> {
    let update: TelegramUpdate = serde_json::from_slice(body).ok()?;
    let message = update.message?;
    Some(IncomingMessage {
        chat_id: message.chat.id,
        text: message.text.unwrap_or_default().trim().to_string(),
    })
}
