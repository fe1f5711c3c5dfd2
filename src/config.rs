//! Configuration management

use anyhow::Result;

/// Relay configuration, read once at invocation start.
///
/// Only the bot token is required up front: a relay that cannot reply is
/// misconfigured for every command, so startup fails fast without it.
/// Everything else is checked inside the handler that needs it so the
/// admin gets an actionable reply instead of a silent drop.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token for outbound sends.
    pub bot_token: String,

    /// Chat id allowed to run `/stats` and `/insights`. Unset means no
    /// chat is admin.
    pub admin_chat_id: Option<String>,

    /// Hosted database project URL.
    pub supabase_url: Option<String>,

    /// Service-role key for the hosted database.
    pub supabase_service_key: Option<String>,

    /// Anthropic API key, needed only for `/insights`.
    pub anthropic_api_key: Option<String>,

    /// Webhook bind host.
    pub host: String,

    /// Webhook bind port.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| anyhow::anyhow!("TELEGRAM_BOT_TOKEN not set"))?;

        let admin_chat_id = std::env::var("ADMIN_CHAT_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let supabase_url = std::env::var("SUPABASE_URL").ok();
        let supabase_service_key = std::env::var("SUPABASE_SERVICE_KEY").ok();
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();

        let host = std::env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("RELAY_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        Ok(Self {
            bot_token,
            admin_chat_id,
            supabase_url,
            supabase_service_key,
            anthropic_api_key,
            host,
            port,
        })
    }
}
