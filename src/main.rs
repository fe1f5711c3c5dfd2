//! Tutoring-App Telegram Relay - Entry Point

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tutor_relay::{server, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("tutor-relay v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if config.admin_chat_id.is_none() {
        info!("ADMIN_CHAT_ID not set - /stats and /insights are disabled");
    }
    if config.supabase_url.is_none() || config.supabase_service_key.is_none() {
        info!("Supabase not configured - linking and stats will reply with a config error");
    }

    server::run(&config).await
}
